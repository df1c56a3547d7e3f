use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::get_by_path;
use crate::value::{is_present, strict_equals};

/// Predicate over the source data gating whether a rule fires.
///
/// Serialized externally tagged:
/// `{"exists": "prompt"}`, `{"equals": ["mode", "edit"]}`, `{"not": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    /// Path resolves to a non-null, non-blank value
    Exists(String),
    /// Path resolves to a value strictly equal to the literal
    Equals(String, Value),
    Not(Box<Condition>),
}

impl Condition {
    pub fn exists(path: impl Into<String>) -> Self {
        Self::Exists(path.into())
    }

    pub fn equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals(path.into(), value.into())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn evaluate(&self, data: &Value) -> bool {
        match self {
            Condition::Exists(path) => is_present(get_by_path(data, path)),
            Condition::Equals(path, expected) => strict_equals(get_by_path(data, path), expected),
            Condition::Not(inner) => !inner.evaluate(data),
        }
    }
}

/// Evaluate an optional condition; a missing condition always passes.
pub fn eval_condition(condition: Option<&Condition>, data: &Value) -> bool {
    condition.map_or(true, |c| c.evaluate(data))
}
