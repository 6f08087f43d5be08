pub mod client;
pub mod error;
pub mod models;

pub use client::AssistantClient;
pub use error::{AssistantError, Result};
pub use models::{CallOptions, ChatChunk, ChatModel, ChatResponse, ChatStream, ChunkAccumulator, ToolChoice, Usage};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
