//! Prompt templates that resolve to image inputs, plus the message, tool and
//! prompt-value types chat models consume.

mod builder;
mod loader;
mod message;
mod partial;
mod template;
mod tools;
pub mod utils;
mod value;

pub use builder::ImagePromptTemplateBuilder;
pub use loader::{default_loader, ImageLoader};
#[cfg(feature = "fs")]
pub use loader::FsImageLoader;
pub use message::{ContentPart, Message, MessageContent, Role, ToolCall};
pub use partial::PartialValue;
pub use template::{ImagePromptTemplate, TemplateFormat};
pub use tools::ToolDefinition;
pub use value::{FormatValues, ImageUrl, PromptValue};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Must provide either an image URL or a path")]
    MissingSource,

    #[error("Image path must be a string")]
    InvalidPathType,

    #[error("Image URL must be a string")]
    InvalidUrlType,

    #[error(
        "Loading images from a path requires the `{feature}` feature of prompt_toolkit; \
         enable it or configure an ImageLoader"
    )]
    MissingOptionalDependency { feature: &'static str },

    #[error("Unsupported template format: {0}")]
    UnsupportedFormat(String),

    #[error("Template validation failed: {0}")]
    Validation(String),

    #[error("Partial variable supplier failed: {0}")]
    Supplier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
