// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.toml";
const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub anthropic: AnthropicConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// Never written back to disk; read from the environment when empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub system_prompt: Option<String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: assistant::models::anthropic::DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            base_url: assistant::models::anthropic::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 60,
            system_prompt: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

impl Config {
    /// `~/.config/promptlens/config.toml`, or the working directory when no
    /// config dir exists.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("promptlens").join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Reads the file at `path`, falling back to defaults when it is missing
    /// or unreadable. The API key from the environment always wins.
    pub fn load_from(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(config_str) => match toml::from_str(&config_str) {
                Ok(config) => {
                    debug!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring invalid config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_VAR) {
            if !key.is_empty() {
                config.anthropic.api_key = key;
            }
        }
        config
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut on_disk = self.clone();
        on_disk.anthropic.api_key.clear();
        let config_str = toml::to_string_pretty(&on_disk)?;
        std::fs::write(path, config_str)?;
        Ok(())
    }
}
