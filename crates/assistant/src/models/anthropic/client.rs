use super::convert::{convert_messages, convert_response, convert_tool_choice, convert_tools};
use super::streaming::chat_stream;
use super::types::{ApiErrorResponse, ChatResponse as ApiResponse, MessagesRequest};
use crate::error::{AssistantError, Result};
use crate::models::{CallOptions, ChatModel, ChatResponse, ChatStream};
use async_trait::async_trait;
use prompt_toolkit::Message;
use reqwest::StatusCode;
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Builds a client from `ANTHROPIC_API_KEY` and the default model
    /// # Errors
    /// Returns error if the variable is unset or empty
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AssistantError::Config("ANTHROPIC_API_KEY must be set".to_string()))?;
        info!("Initializing Anthropic client");
        Ok(Self::new(api_key, DEFAULT_MODEL))
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Replaces the HTTP client with one that enforces `timeout`
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CallOptions,
        stream: bool,
    ) -> Result<MessagesRequest> {
        let (system, messages) = convert_messages(messages)?;

        Ok(MessagesRequest {
            model: self.model.clone(),
            messages,
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
            system,
            temperature: options.temperature,
            stop_sequences: options.stop_sequences.clone(),
            tools: convert_tools(&options.tools),
            tool_choice: options.tool_choice.as_ref().map(convert_tool_choice),
            stream,
        })
    }

    async fn post(&self, request: &MessagesRequest) -> Result<reqwest::Response> {
        debug!(
            "Sending {} messages to {} (stream: {})",
            request.messages.len(),
            self.model,
            request.stream
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        error!("Anthropic API error {}: {}", status, detail);

        if status == StatusCode::UNAUTHORIZED {
            Err(AssistantError::Auth(detail))
        } else {
            Err(AssistantError::Provider(format!(
                "Anthropic API error: {status}: {detail}"
            )))
        }
    }

    /// Send a single user message and get the reply text
    /// # Errors
    /// Returns error if the request fails or the reply has no text
    pub async fn send_message(&self, message: &str) -> Result<String> {
        let response = self
            .invoke(&[Message::user(message)], &CallOptions::default())
            .await?;

        let text = response.text();
        if text.is_empty() {
            return Err(AssistantError::Provider(
                "Empty response from Anthropic API".to_string(),
            ));
        }
        Ok(text)
    }
}

impl fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn invoke(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResponse> {
        let request = self.build_request(messages, options, false)?;
        let response: ApiResponse = self.post(&request).await?.json().await?;
        debug!(
            "Anthropic response {} (stop: {:?})",
            response.id, response.stop_reason
        );
        Ok(convert_response(response))
    }

    async fn stream(&self, messages: &[Message], options: &CallOptions) -> Result<ChatStream> {
        let request = self.build_request(messages, options, true)?;
        let response = self.post(&request).await?;
        Ok(chat_stream(response.bytes_stream()))
    }

    fn id(&self) -> &str {
        "anthropic"
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolChoice;
    use prompt_toolkit::{ContentPart, ImageUrl, ToolDefinition};
    use serde_json::json;

    #[test]
    fn test_build_request() {
        let client = AnthropicClient::new("key", "claude-test").with_max_tokens(256);
        let messages = vec![
            Message::system("You describe images."),
            Message::user(vec![
                ContentPart::image(ImageUrl::new("data:image/png;base64,AAA")),
                ContentPart::text("Describe it."),
            ]),
        ];
        let options = CallOptions::new()
            .with_temperature(0.5)
            .with_tools(vec![ToolDefinition::new("tag", "Tag the image")])
            .with_tool_choice(ToolChoice::Any);

        let request = client.build_request(&messages, &options, false).unwrap();
        let encoded = serde_json::to_value(&request).unwrap();

        assert_eq!(encoded["model"], json!("claude-test"));
        assert_eq!(encoded["max_tokens"], json!(256));
        assert_eq!(encoded["system"], json!("You describe images."));
        assert_eq!(encoded["temperature"], json!(0.5));
        assert_eq!(encoded["tool_choice"], json!({"type": "any"}));
        assert_eq!(encoded["messages"][0]["content"][0]["type"], json!("image"));
        assert!(encoded.get("stream").is_none());
        assert!(encoded.get("stop_sequences").is_none());
    }

    #[test]
    fn test_options_override_max_tokens() {
        let client = AnthropicClient::new("key", "claude-test");
        let request = client
            .build_request(
                &[Message::user("hi")],
                &CallOptions::new().with_max_tokens(10),
                true,
            )
            .unwrap();
        assert_eq!(request.max_tokens, 10);
        assert!(request.stream);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = AnthropicClient::new("key", "m").with_base_url("http://localhost:9000/");
        assert_eq!(client.messages_url(), "http://localhost:9000/v1/messages");
    }

    #[test]
    fn test_debug_hides_key() {
        let client = AnthropicClient::new("sk-secret", "m");
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
