// SPDX-License-Identifier: MPL-2.0

use crate::config::AnthropicConfig;
use anyhow::{Context, Result};
use assistant::models::anthropic::AnthropicClient;
use clap::{Args, Parser, Subcommand};
use prompt_toolkit::{ContentPart, FormatValues, ImagePromptTemplate, ImageUrl, Message};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments for promptlens
#[derive(Debug, Parser)]
#[command(name = "promptlens")]
#[command(about = "Format image prompt templates and ask vision models about them")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the configured model
    #[arg(long, global = true, env = "PROMPTLENS_MODEL", value_name = "MODEL")]
    pub model: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Format an image template and print the resulting JSON
    Format {
        #[command(flatten)]
        image: ImageArgs,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Send an image and a question to the model and stream the answer
    Describe {
        #[command(flatten)]
        image: ImageArgs,

        /// Question to ask about the image
        question: String,

        /// Maximum tokens in the reply
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Write the current configuration to the config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ImageArgs {
    /// Image URL template, e.g. "https://img.example/{id}.png"
    #[arg(long, required_unless_present = "path", conflicts_with = "path")]
    pub url: Option<String>,

    /// Local image path template
    #[arg(long)]
    pub path: Option<String>,

    /// Detail level template (low, high, auto)
    #[arg(long)]
    pub detail: Option<String>,

    /// Template variable as KEY=VALUE; may be repeated
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, Value)>,
}

impl ImageArgs {
    /// The flags as a template with variables inferred from placeholders.
    pub fn template(&self) -> Result<ImagePromptTemplate> {
        let mut fields = Map::new();
        if let Some(url) = &self.url {
            fields.insert("url".into(), Value::String(url.clone()));
        }
        if let Some(path) = &self.path {
            fields.insert("path".into(), Value::String(path.clone()));
        }
        if let Some(detail) = &self.detail {
            fields.insert("detail".into(), Value::String(detail.clone()));
        }
        ImagePromptTemplate::from_template(fields).context("Invalid image template")
    }

    pub fn values(&self) -> FormatValues {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub async fn format(&self) -> Result<ImageUrl> {
        let template = self.template()?;
        template
            .format(&self.values())
            .await
            .context("Failed to format image template")
    }
}

/// Parses `KEY=VALUE`. The value is kept as the exact text given.
pub fn parse_var(s: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in `{s}`"));
    }
    Ok((key.to_string(), Value::String(value.to_string())))
}

/// The conversation sent by `describe`: an optional system prompt, then one
/// user turn holding the image and the question.
pub fn describe_messages(
    image: ImageUrl,
    question: &str,
    system_prompt: Option<&str>,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(vec![
        ContentPart::image(image),
        ContentPart::text(question),
    ]));
    messages
}

pub fn build_client(config: &AnthropicConfig) -> Result<AnthropicClient> {
    if config.api_key.trim().is_empty() {
        anyhow::bail!("No API key configured; set ANTHROPIC_API_KEY or add it to the config file");
    }
    let client = AnthropicClient::new(config.api_key.clone(), config.model.clone())
        .with_base_url(config.base_url.clone())
        .with_max_tokens(config.max_tokens)
        .with_timeout(Duration::from_secs(config.timeout_seconds))?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prompt_toolkit::{MessageContent, Role};
    use serde_json::json;

    fn image_args(url: &str, vars: &[&str]) -> ImageArgs {
        ImageArgs {
            url: Some(url.to_string()),
            path: None,
            detail: None,
            vars: vars.iter().map(|v| parse_var(v).unwrap()).collect(),
        }
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var("id=42").unwrap(), ("id".to_string(), json!("42")));
        assert_eq!(
            parse_var("host=img.example=x").unwrap(),
            ("host".to_string(), json!("img.example=x"))
        );
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_cli_requires_a_source() {
        assert!(Cli::try_parse_from(["promptlens", "format"]).is_err());
        assert!(Cli::try_parse_from(["promptlens", "format", "--url", "a", "--path", "b"]).is_err());

        let cli = Cli::try_parse_from([
            "promptlens", "describe", "--path", "cat.png", "--var", "n=1", "What is it?",
        ])
        .unwrap();
        match cli.command {
            Commands::Describe { image, question, .. } => {
                assert_eq!(image.path.as_deref(), Some("cat.png"));
                assert_eq!(image.vars, vec![("n".to_string(), json!("1"))]);
                assert_eq!(question, "What is it?");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_format_substitutes_vars() {
        let args = ImageArgs {
            detail: Some("{level}".to_string()),
            ..image_args("https://img.example/{id}.png", &["id=7", "level=low"])
        };
        let image = args.format().await.unwrap();
        assert_eq!(image, ImageUrl::new("https://img.example/7.png").with_detail("low"));
    }

    #[tokio::test]
    async fn test_format_keeps_numeric_text() {
        let args = image_args(
            "https://img.example/{id}/{big}.png",
            &["id=1e3", "big=12345678901234567890123"],
        );
        let image = args.format().await.unwrap();
        assert_eq!(image.url, "https://img.example/1e3/12345678901234567890123.png");
    }

    #[test]
    fn test_init_config_command() {
        let cli = Cli::try_parse_from(["promptlens", "--config", "/tmp/p.toml", "init-config", "--force"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/p.toml")));
        assert!(matches!(cli.command, Commands::InitConfig { force: true }));
    }

    #[test]
    fn test_describe_messages() {
        let image = ImageUrl::new("https://img.example/1.png");
        let messages = describe_messages(image.clone(), "What is this?", Some("Be brief."));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(
            messages[1].content,
            MessageContent::Parts(vec![
                ContentPart::image(image.clone()),
                ContentPart::text("What is this?"),
            ])
        );

        assert_eq!(describe_messages(image, "q", Some("  ")).len(), 1);
    }

    #[test]
    fn test_build_client_needs_key() {
        let config = AnthropicConfig::default();
        assert!(build_client(&config).is_err());

        let config = AnthropicConfig {
            api_key: "k".to_string(),
            model: "claude-test".to_string(),
            ..AnthropicConfig::default()
        };
        assert_eq!(build_client(&config).unwrap().model(), "claude-test");
    }
}
