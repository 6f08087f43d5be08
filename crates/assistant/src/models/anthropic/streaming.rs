use super::types::{BlockDelta, ResponseBlock, StreamEvent};
use crate::error::{AssistantError, Result};
use crate::models::{ChatChunk, ChatStream, Usage};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tracing::{debug, warn};

/// Splits a server-sent-event byte stream into `data:` payloads.
///
/// Bytes are buffered until a full line is seen, so events (and multi-byte
/// characters) may be split across network chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes and returns the payload of every completed `data:` line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a trailing line that had no newline.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() {
        None
    } else {
        Some(data.to_string())
    }
}

/// Maps one event payload to the chunks it carries.
pub fn parse_event(data: &str) -> Result<Vec<ChatChunk>> {
    let event: StreamEvent = serde_json::from_str(data)
        .map_err(|e| AssistantError::Stream(format!("malformed event: {e}")))?;

    let chunks = match event {
        StreamEvent::MessageStart { message } => message
            .usage
            .map(|u| {
                vec![ChatChunk::Usage(Usage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                })]
            })
            .unwrap_or_default(),
        StreamEvent::ContentBlockStart {
            index,
            content_block,
        } => match content_block {
            ResponseBlock::ToolUse { id, name, .. } => {
                vec![ChatChunk::ToolCallStart { index, id, name }]
            }
            ResponseBlock::Text { text } if !text.is_empty() => vec![ChatChunk::TextDelta(text)],
            _ => Vec::new(),
        },
        StreamEvent::ContentBlockDelta { index, delta } => match delta {
            BlockDelta::TextDelta { text } => vec![ChatChunk::TextDelta(text)],
            BlockDelta::InputJsonDelta { partial_json } => vec![ChatChunk::ToolCallDelta {
                index,
                partial_json,
            }],
            BlockDelta::Other => Vec::new(),
        },
        StreamEvent::MessageDelta { delta, usage } => {
            let mut chunks = Vec::new();
            if let Some(u) = usage {
                chunks.push(ChatChunk::Usage(Usage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                }));
            }
            if let Some(reason) = delta.stop_reason {
                chunks.push(ChatChunk::Stop { reason });
            }
            chunks
        }
        StreamEvent::Error { error } => {
            return Err(AssistantError::Provider(format!(
                "{}: {}",
                error.error_type, error.message
            )))
        }
        StreamEvent::ContentBlockStop { .. }
        | StreamEvent::MessageStop
        | StreamEvent::Ping
        | StreamEvent::Unknown => Vec::new(),
    };

    Ok(chunks)
}

/// Turns a raw SSE byte stream into a stream of [`ChatChunk`]s.
pub fn chat_stream<S, B, E>(bytes: S) -> ChatStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut decoder = SseDecoder::new();
        let mut bytes = Box::pin(bytes);
        let mut failed = false;

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for data in decoder.push(chunk.as_ref()) {
                        match parse_event(&data) {
                            Ok(chunks) => {
                                for chunk in chunks {
                                    yield Ok(chunk);
                                }
                            }
                            Err(e) => {
                                warn!("Stream event error: {}", e);
                                yield Err(e);
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(AssistantError::Stream(e.to_string()));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            if let Some(data) = decoder.finish() {
                match parse_event(&data) {
                    Ok(chunks) => {
                        for chunk in chunks {
                            yield Ok(chunk);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                    }
                }
            }
        }
        debug!("Event stream finished");
    };

    Box::pin(stream)
}
