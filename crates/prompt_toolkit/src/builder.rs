use crate::{default_loader, ImageLoader, ImagePromptTemplate, PartialValue, Result, TemplateFormat};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ImagePromptTemplateBuilder {
    template: Map<String, Value>,
    template_format: Option<String>,
    validate_template: bool,
    input_variables: Vec<String>,
    partial_variables: BTreeMap<String, PartialValue>,
    loader: Option<Arc<dyn ImageLoader>>,
}

impl Default for ImagePromptTemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePromptTemplateBuilder {
    pub fn new() -> Self {
        Self {
            template: Map::new(),
            template_format: None,
            validate_template: true,
            input_variables: Vec::new(),
            partial_variables: BTreeMap::new(),
            loader: default_loader(),
        }
    }

    pub fn with_template(mut self, template: Map<String, Value>) -> Self {
        self.template = template;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.template.insert(key.into(), value.into());
        self
    }

    pub fn with_template_format(mut self, format: impl Into<String>) -> Self {
        self.template_format = Some(format.into());
        self
    }

    pub fn validate_template(mut self, validate: bool) -> Self {
        self.validate_template = validate;
        self
    }

    pub fn with_input_variables<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_variables = vars.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_input_variable(mut self, var: impl Into<String>) -> Self {
        self.input_variables.push(var.into());
        self
    }

    pub fn with_partial(mut self, key: impl Into<String>, value: impl Into<PartialValue>) -> Self {
        self.partial_variables.insert(key.into(), value.into());
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn without_loader(mut self) -> Self {
        self.loader = None;
        self
    }

    /// # Errors
    /// Fails on an unknown template format, or when validation is on and the
    /// template references a variable that is neither an input nor a partial.
    pub fn build(self) -> Result<ImagePromptTemplate> {
        let template_format = match self.template_format.as_deref() {
            Some(format) => format.parse()?,
            None => TemplateFormat::default(),
        };

        let prompt_template = ImagePromptTemplate {
            template: self.template,
            template_format,
            validate_template: self.validate_template,
            input_variables: self.input_variables,
            partial_variables: self.partial_variables,
            loader: self.loader,
        };

        if prompt_template.validate_template {
            prompt_template.validate()?;
        }

        Ok(prompt_template)
    }
}
