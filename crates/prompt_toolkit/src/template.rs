use crate::utils::{extract_variables, is_truthy, substitute};
use crate::{
    Error, FormatValues, ImageLoader, ImagePromptTemplateBuilder, ImageUrl, PartialValue,
    PromptValue, Result,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Placeholder syntax of a template. Only f-string style `{name}` is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemplateFormat {
    #[default]
    FString,
}

impl FromStr for TemplateFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "f-string" | "fstring" => Ok(TemplateFormat::FString),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateFormat::FString => f.write_str("f-string"),
        }
    }
}

/// A template whose fields resolve to an image `{url, detail}`.
///
/// The template is a JSON object. String fields may carry `{name}`
/// placeholders; the `url`, `path` and `detail` fields are the ones that
/// matter for the result. Instances never change after construction:
/// [`partial`](Self::partial) hands back a new template.
#[derive(Clone)]
pub struct ImagePromptTemplate {
    pub(crate) template: Map<String, Value>,
    pub(crate) template_format: TemplateFormat,
    pub(crate) validate_template: bool,
    pub(crate) input_variables: Vec<String>,
    pub(crate) partial_variables: BTreeMap<String, PartialValue>,
    pub(crate) loader: Option<Arc<dyn ImageLoader>>,
}

impl ImagePromptTemplate {
    pub fn builder() -> ImagePromptTemplateBuilder {
        ImagePromptTemplateBuilder::new()
    }

    /// Builds a template whose input variables are the placeholders it uses.
    pub fn from_template(template: Map<String, Value>) -> Result<Self> {
        let input_variables = referenced_variables(&template);
        Self::builder()
            .with_template(template)
            .with_input_variables(input_variables)
            .build()
    }

    pub fn template(&self) -> &Map<String, Value> {
        &self.template
    }

    pub fn template_format(&self) -> TemplateFormat {
        self.template_format
    }

    pub fn validates_template(&self) -> bool {
        self.validate_template
    }

    /// Variables a caller still has to supply at format time.
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    pub fn partial_variables(&self) -> impl Iterator<Item = &str> {
        self.partial_variables.keys().map(String::as_str)
    }

    /// Every placeholder name the template's string fields reference.
    pub fn template_variables(&self) -> Vec<String> {
        referenced_variables(&self.template)
    }

    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Checks that every referenced variable is declared as an input or bound
    /// as a partial.
    pub(crate) fn validate(&self) -> Result<()> {
        let missing: Vec<String> = self
            .template_variables()
            .into_iter()
            .filter(|var| {
                !self.input_variables.contains(var) && !self.partial_variables.contains_key(var)
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "template references undeclared variables: {}",
                missing.join(", ")
            )))
        }
    }

    /// Returns a copy with `values` bound. The supplied keys drop out of the
    /// input variables, and on collision the new binding wins.
    pub fn partial<I, K, V>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PartialValue>,
    {
        let mut partial_variables = self.partial_variables.clone();
        let mut supplied = Vec::new();
        for (key, value) in values {
            let key: String = key.into();
            supplied.push(key.clone());
            partial_variables.insert(key, value.into());
        }

        let input_variables = self
            .input_variables
            .iter()
            .filter(|var| !supplied.contains(*var))
            .cloned()
            .collect();

        Self {
            input_variables,
            partial_variables,
            ..self.clone()
        }
    }

    /// Resolves partial values and overlays the caller's values on top.
    pub async fn merge_partial_and_user_variables(
        &self,
        values: &FormatValues,
    ) -> Result<FormatValues> {
        let mut merged = FormatValues::new();
        for (key, partial) in &self.partial_variables {
            merged.set(key.clone(), partial.resolve().await?);
        }
        Ok(merged.merge(values))
    }

    /// Substitutes placeholders in every string field; other fields are
    /// copied through untouched.
    pub fn format_template(&self, values: &FormatValues) -> Map<String, Value> {
        self.template
            .iter()
            .map(|(key, value)| {
                let formatted = match value {
                    Value::String(s) => Value::String(substitute(s, |name| values.get(name))),
                    other => other.clone(),
                };
                (key.clone(), formatted)
            })
            .collect()
    }

    /// Formats the template into an image reference.
    ///
    /// # Errors
    /// Fails when neither a url nor a path resolves, when either has the
    /// wrong type, or when a path needs loading and no loader is configured.
    pub async fn format(&self, values: &FormatValues) -> Result<ImageUrl> {
        let values = self.merge_partial_and_user_variables(values).await?;
        let formatted = self.format_template(&values);

        let url = pick(values.url.as_ref(), formatted.get("url"));
        let path = pick(values.path.as_ref(), formatted.get("path"));
        let detail = pick(values.detail.as_ref(), formatted.get("detail"));

        let url = match (url, path) {
            (None, None) => return Err(Error::MissingSource),
            (Some(url), _) => url.clone(),
            (None, Some(path)) => {
                let path = path.as_str().ok_or(Error::InvalidPathType)?;
                let loader = self.loader.as_ref().ok_or(Error::MissingOptionalDependency {
                    feature: "fs",
                })?;
                debug!("Converting image path {} to a data URL", path);
                Value::String(loader.path_to_data_url(path).await?)
            }
        };

        let url = match url {
            Value::String(url) => url,
            _ => return Err(Error::InvalidUrlType),
        };

        Ok(ImageUrl {
            url,
            detail: detail.and_then(detail_string),
        })
    }

    pub async fn format_prompt_value(&self, values: &FormatValues) -> Result<PromptValue> {
        Ok(PromptValue::Image(self.format(values).await?))
    }
}

impl fmt::Debug for ImagePromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePromptTemplate")
            .field("template", &self.template)
            .field("template_format", &self.template_format)
            .field("validate_template", &self.validate_template)
            .field("input_variables", &self.input_variables)
            .field("partial_variables", &self.partial_variables)
            .field("loader", &self.loader.is_some())
            .finish()
    }
}

pub(crate) fn referenced_variables(template: &Map<String, Value>) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for value in template.values() {
        if let Value::String(s) = value {
            for var in extract_variables(s) {
                if !vars.contains(&var) {
                    vars.push(var);
                }
            }
        }
    }
    vars
}

fn pick<'a>(explicit: Option<&'a Value>, field: Option<&'a Value>) -> Option<&'a Value> {
    explicit
        .filter(|v| is_truthy(v))
        .or_else(|| field.filter(|v| is_truthy(v)))
}

fn detail_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct FixedLoader;

    #[async_trait]
    impl ImageLoader for FixedLoader {
        async fn path_to_data_url(&self, path: &str) -> Result<String> {
            match path {
                "/tmp/a.png" => Ok("data:image/png;base64,AAA".to_string()),
                other => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    other.to_string(),
                ))),
            }
        }
    }

    fn template(value: Value) -> ImagePromptTemplate {
        let map = value.as_object().cloned().unwrap();
        ImagePromptTemplate::from_template(map)
            .unwrap()
            .with_loader(Arc::new(FixedLoader))
    }

    #[tokio::test]
    async fn test_explicit_url() {
        let image = template(json!({}))
            .format(&FormatValues::new().with_url("http://x"))
            .await
            .unwrap();
        assert_eq!(image, ImageUrl::new("http://x"));
        assert_eq!(serde_json::to_value(&image).unwrap(), json!({"url": "http://x"}));
    }

    #[tokio::test]
    async fn test_path_goes_through_loader() {
        let image = template(json!({}))
            .format(&FormatValues::new().with_path("/tmp/a.png"))
            .await
            .unwrap();
        assert_eq!(image.url, "data:image/png;base64,AAA");
        assert_eq!(image.detail, None);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let err = template(json!({}))
            .format(&FormatValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingSource));
    }

    #[tokio::test]
    async fn test_placeholder_substitution() {
        let image = template(json!({"url": "{u}"}))
            .format(&FormatValues::new().with_variable("u", "http://y"))
            .await
            .unwrap();
        assert_eq!(image.url, "http://y");
    }

    #[tokio::test]
    async fn test_unresolved_placeholder_is_kept() {
        let image = template(json!({"url": "{u}"}))
            .format(&FormatValues::new())
            .await
            .unwrap();
        assert_eq!(image.url, "{u}");
    }

    #[tokio::test]
    async fn test_detail_from_template() {
        let image = template(json!({"url": "http://x", "detail": "low"}))
            .format(&FormatValues::new())
            .await
            .unwrap();
        assert_eq!(image, ImageUrl::new("http://x").with_detail("low"));
    }

    #[tokio::test]
    async fn test_explicit_values_beat_template_fields() {
        let image = template(json!({"url": "http://template", "detail": "low"}))
            .format(&FormatValues::new().with_url("http://explicit").with_detail("high"))
            .await
            .unwrap();
        assert_eq!(image, ImageUrl::new("http://explicit").with_detail("high"));
    }

    #[tokio::test]
    async fn test_empty_explicit_url_falls_back() {
        let image = template(json!({"url": "http://template"}))
            .format(&FormatValues::new().with_url(""))
            .await
            .unwrap();
        assert_eq!(image.url, "http://template");
    }

    #[tokio::test]
    async fn test_url_beats_path() {
        let image = template(json!({"path": "/nowhere.png"}))
            .format(&FormatValues::new().with_url("http://x"))
            .await
            .unwrap();
        assert_eq!(image.url, "http://x");
    }

    #[tokio::test]
    async fn test_path_template_with_placeholder() {
        let image = template(json!({"path": "/tmp/{name}.png"}))
            .format(&FormatValues::new().with_variable("name", "a"))
            .await
            .unwrap();
        assert_eq!(image.url, "data:image/png;base64,AAA");
    }

    #[tokio::test]
    async fn test_non_string_path_rejected() {
        let err = template(json!({}))
            .format(&FormatValues::new().with_path(42))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPathType));
    }

    #[tokio::test]
    async fn test_non_string_url_rejected() {
        let err = template(json!({"url": ["http://x"]}))
            .format(&FormatValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrlType));
    }

    #[tokio::test]
    async fn test_missing_loader() {
        let tpl = ImagePromptTemplate::builder()
            .without_loader()
            .build()
            .unwrap();
        let err = tpl
            .format(&FormatValues::new().with_path("/tmp/a.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingOptionalDependency { feature: "fs" }));
        assert!(err.to_string().contains("`fs` feature"));
    }

    #[tokio::test]
    async fn test_falsy_detail_dropped() {
        let image = template(json!({"url": "http://x", "detail": ""}))
            .format(&FormatValues::new())
            .await
            .unwrap();
        assert_eq!(image.detail, None);
    }

    #[test]
    fn test_format_template_passes_literals_through() {
        let tpl = template(json!({"url": "http://x", "width": 512, "tags": ["a", "b"]}));
        let values = FormatValues::new().with_variable("unused", "v");
        assert_eq!(&tpl.format_template(&values), tpl.template());
    }

    #[test]
    fn test_format_template_numbers() {
        let tpl = template(json!({"url": "http://img/{id}.png"}));
        let formatted = tpl.format_template(&FormatValues::new().with_variable("id", 7));
        assert_eq!(formatted.get("url"), Some(&json!("http://img/7.png")));
    }

    #[test]
    fn test_template_format_parse() {
        assert_eq!("f-string".parse::<TemplateFormat>().unwrap(), TemplateFormat::FString);
        assert!(matches!(
            "mustache".parse::<TemplateFormat>(),
            Err(Error::UnsupportedFormat(f)) if f == "mustache"
        ));
    }
}
