use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::condition::Condition;
use crate::error::{MappingError, Result};
use crate::transforms::Transform;

/// Deserialize a field that may legitimately hold `null`.
///
/// Combined with `#[serde(default)]`: a missing field is `None`, an explicit
/// `null` is `Some(Value::Null)`.
pub(crate) fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Where a rule reads its raw value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Path(String),
    /// Resolved into a parallel array, usually followed by `coalesce`
    Paths(Vec<String>),
}

/// Reference into a collection of uploaded files in the form data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    /// Path of the collection, e.g. `images`
    pub field: String,
    /// Element to select when the collection is an array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Key to read from the selected item, e.g. `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// One declarative instruction: source -> transforms -> target path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRule {
    pub to: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Source>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_file: Option<FileRef>,

    /// Literal value; wins over `from` and `fromFile`, `null` included
    #[serde(
        rename = "const",
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub constant: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<Transform>,
}

impl MappingRule {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: None,
            from_file: None,
            constant: None,
            when: None,
            transform: Vec::new(),
        }
    }

    pub fn source(mut self, path: impl Into<String>) -> Self {
        self.from = Some(Source::Path(path.into()));
        self
    }

    pub fn sources<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.from = Some(Source::Paths(paths.into_iter().map(Into::into).collect()));
        self
    }

    pub fn file(mut self, file: FileRef) -> Self {
        self.from_file = Some(file);
        self
    }

    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        self.constant = Some(value.into());
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.when = Some(condition);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform.push(transform);
        self
    }
}

/// Ordered rules describing one model's input payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingSchema {
    pub rules: Vec<MappingRule>,
}

impl MappingSchema {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let schema: Self = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load and validate a schema file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let schema = Self::from_json_str(&content)?;

        tracing::info!(
            "Loaded mapping schema ({} rules) from: {}",
            schema.rules.len(),
            path.as_ref().display()
        );
        Ok(schema)
    }

    /// Reject rules that could never write anything meaningful.
    pub fn validate(&self) -> Result<()> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.to.trim().is_empty() {
                return Err(MappingError::invalid_rule(index, "'to' must not be empty"));
            }
            if let Some(Source::Path(path)) = &rule.from {
                if path.trim().is_empty() {
                    return Err(MappingError::invalid_rule(index, "'from' must not be empty"));
                }
            }
            if let Some(file) = &rule.from_file {
                if file.field.trim().is_empty() {
                    return Err(MappingError::invalid_rule(
                        index,
                        "'fromFile.field' must not be empty",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Names referenced by `customFn` transforms, in rule order.
    pub fn custom_function_names(&self) -> Vec<&str> {
        self.rules
            .iter()
            .flat_map(|rule| rule.transform.iter())
            .filter_map(|transform| match transform {
                Transform::CustomFn { name } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}
