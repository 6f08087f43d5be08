use crate::{ContentPart, Message, MessageContent, Role};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A resolved image reference, ready to hand to a multimodal model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ImageUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Values supplied to [`crate::ImagePromptTemplate::format`].
///
/// `url`, `path` and `detail` are the fields the formatter treats specially;
/// everything else lives in `variables` and only feeds placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(flatten)]
    pub variables: Map<String, Value>,
}

impl FormatValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<Value>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<Value>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value.into());
        self
    }

    /// Looks a name up the way a placeholder does: special fields first,
    /// then free variables.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match key {
            "url" => self.url.as_ref(),
            "path" => self.path.as_ref(),
            "detail" => self.detail.as_ref(),
            _ => self.variables.get(key),
        }
    }

    /// Inserts a value, routing the special names to their fields.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match key.as_str() {
            "url" => self.url = Some(value),
            "path" => self.path = Some(value),
            "detail" => self.detail = Some(value),
            _ => {
                self.variables.insert(key, value);
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Overlays `other` on top of `self`; keys in `other` win.
    pub fn merge(mut self, other: &FormatValues) -> Self {
        for (key, value) in other.iter() {
            self.set(key, value.clone());
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        let special = [
            ("url", self.url.as_ref()),
            ("path", self.path.as_ref()),
            ("detail", self.detail.as_ref()),
        ];
        special
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .chain(self.variables.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

impl<K, V> FromIterator<(K, V)> for FormatValues
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FormatValues::new();
        for (k, v) in iter {
            values.set(k, v.into());
        }
        values
    }
}

/// The carrier a formatted prompt travels in before it reaches a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PromptValue {
    Text(String),
    Image(ImageUrl),
    Chat(Vec<Message>),
}

impl PromptValue {
    /// Renders the prompt as a conversation. Text and images become a single
    /// user turn.
    pub fn to_messages(&self) -> Vec<Message> {
        match self {
            PromptValue::Text(text) => vec![Message::user(text.clone())],
            PromptValue::Image(image) => vec![Message::new(
                Role::User,
                MessageContent::Parts(vec![ContentPart::image(image.clone())]),
            )],
            PromptValue::Chat(messages) => messages.clone(),
        }
    }
}

impl fmt::Display for PromptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptValue::Text(text) => f.write_str(text),
            PromptValue::Image(image) => f.write_str(&image.url),
            PromptValue::Chat(messages) => {
                for (i, msg) in messages.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{}: {}", msg.role, msg.content.text())?;
                }
                Ok(())
            }
        }
    }
}
