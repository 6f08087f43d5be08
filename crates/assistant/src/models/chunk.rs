use super::{ChatResponse, Usage};
use crate::error::Result;
use futures::Stream;
use prompt_toolkit::{Message, ToolCall};
use serde_json::Value;
use std::pin::Pin;
use tracing::warn;

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// One incremental piece of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatChunk {
    TextDelta(String),
    ToolCallStart {
        index: usize,
        id: String,
        name: String,
    },
    ToolCallDelta {
        index: usize,
        partial_json: String,
    },
    Usage(Usage),
    Stop {
        reason: String,
    },
}

#[derive(Debug, Default)]
struct PendingToolCall {
    index: usize,
    id: String,
    name: String,
    arguments: String,
}

/// Folds streamed chunks back into a [`ChatResponse`].
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    text: String,
    tool_calls: Vec<PendingToolCall>,
    usage: Option<Usage>,
    stop_reason: Option<String>,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &ChatChunk) {
        match chunk {
            ChatChunk::TextDelta(text) => self.text.push_str(text),
            ChatChunk::ToolCallStart { index, id, name } => {
                self.tool_calls.push(PendingToolCall {
                    index: *index,
                    id: id.clone(),
                    name: name.clone(),
                    arguments: String::new(),
                });
            }
            ChatChunk::ToolCallDelta {
                index,
                partial_json,
            } => match self.tool_calls.iter_mut().find(|c| c.index == *index) {
                Some(call) => call.arguments.push_str(partial_json),
                None => warn!("Tool call delta for unknown block {}", index),
            },
            ChatChunk::Usage(usage) => {
                // Input tokens arrive first, output tokens in the final delta.
                let current = self.usage.get_or_insert_with(Usage::default);
                if usage.input_tokens > 0 {
                    current.input_tokens = usage.input_tokens;
                }
                if usage.output_tokens > 0 {
                    current.output_tokens = usage.output_tokens;
                }
            }
            ChatChunk::Stop { reason } => self.stop_reason = Some(reason.clone()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// # Errors
    /// Returns error if a tool call's accumulated arguments are not valid JSON
    pub fn finish(self) -> Result<ChatResponse> {
        let tool_calls = self
            .tool_calls
            .into_iter()
            .map(|call| -> Result<ToolCall> {
                let arguments = if call.arguments.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&call.arguments)?
                };
                Ok(ToolCall {
                    id: call.id,
                    name: call.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatResponse {
            message: Message::assistant(self.text).with_tool_calls(tool_calls),
            stop_reason: self.stop_reason,
            usage: self.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_accumulates_text_and_tools() {
        let mut acc = ChunkAccumulator::new();
        for chunk in [
            ChatChunk::Usage(Usage {
                input_tokens: 12,
                output_tokens: 0,
            }),
            ChatChunk::TextDelta("Let me ".into()),
            ChatChunk::TextDelta("check.".into()),
            ChatChunk::ToolCallStart {
                index: 1,
                id: "toolu_1".into(),
                name: "get_weather".into(),
            },
            ChatChunk::ToolCallDelta {
                index: 1,
                partial_json: "{\"city\": ".into(),
            },
            ChatChunk::ToolCallDelta {
                index: 1,
                partial_json: "\"Paris\"}".into(),
            },
            ChatChunk::Usage(Usage {
                input_tokens: 0,
                output_tokens: 30,
            }),
            ChatChunk::Stop {
                reason: "tool_use".into(),
            },
        ] {
            acc.push(&chunk);
        }

        let response = acc.finish().unwrap();
        assert_eq!(response.text(), "Let me check.");
        assert_eq!(response.message.tool_calls.len(), 1);
        assert_eq!(response.message.tool_calls[0].arguments, json!({"city": "Paris"}));
        assert_eq!(response.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(response.usage.unwrap().total_tokens(), 42);
    }

    #[test]
    fn test_empty_tool_arguments() {
        let mut acc = ChunkAccumulator::new();
        acc.push(&ChatChunk::ToolCallStart {
            index: 0,
            id: "toolu_2".into(),
            name: "now".into(),
        });
        let response = acc.finish().unwrap();
        assert_eq!(response.message.tool_calls[0].arguments, json!({}));
    }

    #[test]
    fn test_bad_tool_arguments() {
        let mut acc = ChunkAccumulator::new();
        acc.push(&ChatChunk::ToolCallStart {
            index: 0,
            id: "toolu_3".into(),
            name: "broken".into(),
        });
        acc.push(&ChatChunk::ToolCallDelta {
            index: 0,
            partial_json: "{\"a\":".into(),
        });
        assert!(acc.finish().is_err());
    }
}
