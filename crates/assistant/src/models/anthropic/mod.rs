mod client;
pub mod convert;
pub mod streaming;
mod types;

pub use client::{AnthropicClient, API_VERSION, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use streaming::{chat_stream, SseDecoder};
pub use types::{ChatMessage, ContentBlock, ImageSource, MessagesRequest};
