use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool the model may call. `parameters` is a JSON schema object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Adds one property to the schema, marking it required when asked.
    pub fn add_parameter(
        mut self,
        name: impl Into<String>,
        schema: Value,
        required: bool,
    ) -> Self {
        let name = name.into();
        if let Some(props) = self
            .parameters
            .get_mut("properties")
            .and_then(Value::as_object_mut)
        {
            props.insert(name.clone(), schema);
        }
        if required {
            match self.parameters.get_mut("required").and_then(Value::as_array_mut) {
                Some(list) => list.push(Value::String(name)),
                None => {
                    if let Some(obj) = self.parameters.as_object_mut() {
                        obj.insert("required".to_string(), json!([name]));
                    }
                }
            }
        }
        self
    }
}
