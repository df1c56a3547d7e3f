use serde_json::Value;
use std::collections::HashMap;

use crate::error::CustomFnError;

/// A named function usable from a `customFn` transform.
///
/// Receives the current pipeline value (`None` when absent) and returns the
/// replacement. Errors are logged by the pipeline and leave the value as is.
pub type CustomFn = fn(Option<&Value>) -> Result<Option<Value>, CustomFnError>;

/// Static name -> function table consulted by `customFn` transforms.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    funcs: HashMap<String, CustomFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the functions shipped with the engine.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("imageSizeToAspectRatio", image_size_to_aspect_ratio);
        registry.register("splitLines", split_lines);
        registry.register("stringifyJson", stringify_json);
        registry
    }

    pub fn register(&mut self, name: &str, func: CustomFn) {
        self.funcs.insert(name.to_string(), func);
    }

    pub fn get(&self, name: &str) -> Option<&CustomFn> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// `{width, height}` -> reduced `"W:H"`, e.g. `{1920, 1080}` -> `"16:9"`.
fn image_size_to_aspect_ratio(value: Option<&Value>) -> Result<Option<Value>, CustomFnError> {
    let size = value
        .and_then(Value::as_object)
        .ok_or_else(|| CustomFnError::new("expected an object with width and height"))?;
    let dimension = |key: &str| {
        size.get(key)
            .and_then(Value::as_u64)
            .filter(|d| *d > 0)
            .ok_or_else(|| CustomFnError::new(format!("'{key}' must be a positive integer")))
    };
    let (width, height) = (dimension("width")?, dimension("height")?);
    let divisor = gcd(width, height);
    Ok(Some(Value::String(format!(
        "{}:{}",
        width / divisor,
        height / divisor
    ))))
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Multi-line text -> array of trimmed, non-empty lines.
fn split_lines(value: Option<&Value>) -> Result<Option<Value>, CustomFnError> {
    let text = value
        .and_then(Value::as_str)
        .ok_or_else(|| CustomFnError::new("expected a string"))?;
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Value::String(line.to_string()))
        .collect();
    Ok(Some(Value::Array(lines)))
}

fn stringify_json(value: Option<&Value>) -> Result<Option<Value>, CustomFnError> {
    let value = value.ok_or_else(|| CustomFnError::new("nothing to stringify"))?;
    serde_json::to_string(value)
        .map(|s| Some(Value::String(s)))
        .map_err(|e| CustomFnError::new(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_lookup() {
        fn shout(value: Option<&Value>) -> Result<Option<Value>, CustomFnError> {
            Ok(value.and_then(Value::as_str).map(|s| json!(format!("{s}!"))))
        }

        let mut registry = FunctionRegistry::new();
        assert!(!registry.contains("shout"));
        registry.register("shout", shout);

        let f = registry.get("shout").unwrap();
        assert_eq!(f(Some(&json!("hi"))).unwrap(), Some(json!("hi!")));
    }

    #[test]
    fn test_builtin_names() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["imageSizeToAspectRatio", "splitLines", "stringifyJson"]
        );
    }

    #[test]
    fn test_image_size_to_aspect_ratio() {
        let out = image_size_to_aspect_ratio(Some(&json!({"width": 1920, "height": 1080}))).unwrap();
        assert_eq!(out, Some(json!("16:9")));

        let out = image_size_to_aspect_ratio(Some(&json!({"width": 1024, "height": 1024}))).unwrap();
        assert_eq!(out, Some(json!("1:1")));

        assert!(image_size_to_aspect_ratio(Some(&json!({"width": 0, "height": 5}))).is_err());
        assert!(image_size_to_aspect_ratio(Some(&json!("16:9"))).is_err());
    }

    #[test]
    fn test_split_lines() {
        let out = split_lines(Some(&json!("a cat\n\n  a dog \n"))).unwrap();
        assert_eq!(out, Some(json!(["a cat", "a dog"])));
        assert!(split_lines(None).is_err());
    }

    #[test]
    fn test_stringify_json() {
        let out = stringify_json(Some(&json!({"a": [1, 2]}))).unwrap();
        assert_eq!(out, Some(json!(r#"{"a":[1,2]}"#)));
    }
}
