#![allow(dead_code)]

use assistant::error::Result;
use assistant::models::{CallOptions, ChatChunk, ChatModel, ChatResponse, ChatStream};
use async_trait::async_trait;
use prompt_toolkit::Message;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub struct MockModel {
    response: String,
    streaming: bool,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockModel {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            streaming: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Vec<Message>>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn invoke(&self, messages: &[Message], _options: &CallOptions) -> Result<ChatResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(ChatResponse {
            message: Message::assistant(self.response.clone()),
            stop_reason: Some("end_turn".to_string()),
            usage: None,
        })
    }

    async fn stream(&self, messages: &[Message], _options: &CallOptions) -> Result<ChatStream> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let chunks: Vec<Result<ChatChunk>> = self
            .response
            .split_inclusive(' ')
            .map(|word| Ok(ChatChunk::TextDelta(word.to_string())))
            .chain(std::iter::once(Ok(ChatChunk::Stop {
                reason: "end_turn".to_string(),
            })))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    fn id(&self) -> &str {
        "mock"
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }
}

pub fn text_response(text: &str) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "model": "claude-test",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 12, "output_tokens": 4}
    })
}

pub fn tool_use_response(id: &str, name: &str, input: Value) -> Value {
    json!({
        "id": "msg_tool",
        "type": "message",
        "model": "claude-test",
        "role": "assistant",
        "content": [
            {"type": "text", "text": "Let me check."},
            {"type": "tool_use", "id": id, "name": name, "input": input}
        ],
        "stop_reason": "tool_use",
        "usage": {"input_tokens": 30, "output_tokens": 20}
    })
}

/// Renders events as an SSE body the way the Messages API frames them.
pub fn sse_body(events: &[Value]) -> String {
    let mut body = String::new();
    for event in events {
        let name = event["type"].as_str().unwrap_or("message");
        body.push_str("event: ");
        body.push_str(name);
        body.push_str("\ndata: ");
        body.push_str(&event.to_string());
        body.push_str("\n\n");
    }
    body
}
