// Placeholder handling for f-string style templates
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

lazy_static! {
    static ref VARIABLE_REGEX: Regex = Regex::new(r"\{([^{}]*)\}").unwrap();
}

/// Returns the placeholder names in `template`, in order of first appearance.
/// A bare `{}` names nothing and is skipped.
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for cap in VARIABLE_REGEX.captures_iter(template) {
        if let Some(m) = cap.get(1) {
            if !m.as_str().is_empty() && !vars.iter().any(|v| v == m.as_str()) {
                vars.push(m.as_str().to_string());
            }
        }
    }
    vars
}

/// Replaces every `{name}` whose lookup yields a string or number.
///
/// Any other placeholder, including one with no value at all, is left as the
/// original `{name}` text.
pub fn substitute<'a, F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a Value>,
{
    VARIABLE_REGEX
        .replace_all(template, |cap: &Captures| match lookup(&cap[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => cap[0].to_string(),
        })
        .into_owned()
}

/// JavaScript-style truthiness, used when picking between explicit values
/// and template fields.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_extract_variables() {
        let template = "Hello {name}, today is {day}! Bye {name}";
        let vars = extract_variables(template);
        assert_eq!(vars, vec!["name", "day"]);
    }

    #[test]
    fn test_substitute_strings_and_numbers() {
        let values: HashMap<&str, Value> =
            [("host", json!("example.com")), ("port", json!(8080))].into();
        let out = substitute("https://{host}:{port}/img", |k| values.get(k));
        assert_eq!(out, "https://example.com:8080/img");
    }

    #[test]
    fn test_substitute_leaves_unresolved() {
        let values: HashMap<&str, Value> = [("flag", json!(true)), ("obj", json!({"a": 1}))].into();
        let out = substitute("{missing}/{flag}/{obj}", |k| values.get(k));
        assert_eq!(out, "{missing}/{flag}/{obj}");
    }

    #[test]
    fn test_empty_braces_are_not_variables() {
        assert_eq!(extract_variables("a{}b{x}{}"), vec!["x"]);
        let values: HashMap<&str, Value> = [("x", json!("1"))].into();
        assert_eq!(substitute("a{}b{x}", |k| values.get(k)), "a{}b1");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&Value::Null));
        assert!(is_truthy(&json!("low")));
        assert!(is_truthy(&json!(2)));
    }
}
