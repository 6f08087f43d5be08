use crate::error::Result;
use async_trait::async_trait;
use prompt_toolkit::{Message, ToolDefinition};
use serde::{Deserialize, Serialize};

pub mod anthropic;
mod chunk;

pub use chunk::{ChatChunk, ChatStream, ChunkAccumulator};

/// How the model may pick among the offered tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    Any,
    None,
    Tool(String),
}

/// Per-call generation settings.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub stop_sequences: Vec<String>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: Option<ToolChoice>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_stop_sequence(mut self, stop: impl Into<String>) -> Self {
        self.stop_sequences.push(stop.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A complete (non-streamed) model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub message: Message,
    pub stop_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn text(&self) -> String {
        self.message.content.text()
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a conversation and wait for the full reply
    async fn invoke(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResponse>;

    /// Send a conversation and receive the reply as it is generated
    async fn stream(&self, messages: &[Message], options: &CallOptions) -> Result<ChatStream>;

    /// Get model identifier
    fn id(&self) -> &str;

    /// Check if model supports streaming
    fn supports_streaming(&self) -> bool;
}
