use crate::error::{AssistantError, Result};
use crate::models::{CallOptions, ChatModel, ChatResponse, ChatStream};
use prompt_toolkit::{Message, PromptValue};
use std::sync::Arc;
use tracing::debug;

#[allow(clippy::module_name_repetitions)]
pub struct AssistantClient {
    model: Arc<dyn ChatModel>,
}

impl AssistantClient {
    /// Creates a new client instance
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn model_id(&self) -> &str {
        self.model.id()
    }

    /// Send a message and get a response
    /// # Errors
    /// Returns error if message sending fails
    pub async fn send_message(&self, message: &str) -> Result<String> {
        let response = self
            .send_messages(&[Message::user(message)], &CallOptions::default())
            .await?;
        Ok(response.text())
    }

    /// Send a whole conversation
    /// # Errors
    /// Returns error if the model call fails
    pub async fn send_messages(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ChatResponse> {
        debug!("Sending {} messages to {}", messages.len(), self.model.id());
        self.model.invoke(messages, options).await
    }

    /// Send a formatted prompt
    /// # Errors
    /// Returns error if the model call fails
    pub async fn send_prompt(
        &self,
        prompt: &PromptValue,
        options: &CallOptions,
    ) -> Result<ChatResponse> {
        self.send_messages(&prompt.to_messages(), options).await
    }

    /// Stream the reply to a conversation
    /// # Errors
    /// Returns error if the model cannot stream or the call fails
    pub async fn stream_messages(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ChatStream> {
        if !self.model.supports_streaming() {
            return Err(AssistantError::Model(format!(
                "{} does not support streaming",
                self.model.id()
            )));
        }
        self.model.stream(messages, options).await
    }

    /// Stream the reply to a formatted prompt
    /// # Errors
    /// Returns error if the model cannot stream or the call fails
    pub async fn stream_prompt(
        &self,
        prompt: &PromptValue,
        options: &CallOptions,
    ) -> Result<ChatStream> {
        self.stream_messages(&prompt.to_messages(), options).await
    }
}
