use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum AssistantError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Prompt(#[from] prompt_toolkit::Error),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
