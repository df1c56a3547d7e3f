use serde_json::{Map, Value};
use std::sync::Arc;

use crate::condition::eval_condition;
use crate::functions::FunctionRegistry;
use crate::path::{get_by_path, set_by_path};
use crate::schema::{FileRef, MappingRule, MappingSchema, Source};
use crate::transforms::{apply_transforms, TransformContext};

/// Evaluates mapping schemas against form data.
///
/// Holds no per-call state; share it behind an `Arc` across tasks.
#[derive(Debug, Clone, Default)]
pub struct MappingEngine {
    functions: Arc<FunctionRegistry>,
}

impl MappingEngine {
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self { functions }
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Build the provider payload for `data` by running every rule in order.
    ///
    /// Never fails: rules that resolve to nothing are skipped, and custom
    /// function problems are logged and degrade to pass-through.
    pub fn build(&self, schema: &MappingSchema, data: &Value) -> Value {
        let ctx = TransformContext::new(&self.functions);
        let mut output = Map::new();

        for rule in &schema.rules {
            if !eval_condition(rule.when.as_ref(), data) {
                tracing::debug!(target_path = %rule.to, "Rule condition not met, skipping");
                continue;
            }

            let raw = resolve_raw(rule, data);
            match apply_transforms(raw, &rule.transform, &ctx) {
                Some(value) if should_write(&value) => set_by_path(&mut output, &rule.to, value),
                _ => tracing::debug!(target_path = %rule.to, "Rule produced no value, skipping"),
            }
        }

        Value::Object(output)
    }
}

/// Build a payload with the built-in custom functions available.
///
/// Use a [`MappingEngine`] to supply additional functions.
pub fn build_api_input(schema: &MappingSchema, data: &Value) -> Value {
    MappingEngine::new(Arc::new(FunctionRegistry::with_builtins())).build(schema, data)
}

/// Empty strings are written on purpose: an explicitly blank field differs
/// from an absent one. Empty arrays are treated as absent.
fn should_write(value: &Value) -> bool {
    !matches!(value, Value::Array(items) if items.is_empty())
}

fn resolve_raw(rule: &MappingRule, data: &Value) -> Option<Value> {
    if let Some(constant) = &rule.constant {
        return Some(constant.clone());
    }
    match &rule.from {
        Some(Source::Path(path)) => get_by_path(data, path).cloned(),
        Some(Source::Paths(paths)) => Some(Value::Array(
            paths
                .iter()
                .map(|path| get_by_path(data, path).cloned().unwrap_or(Value::Null))
                .collect(),
        )),
        None => rule
            .from_file
            .as_ref()
            .and_then(|file| resolve_file(file, data)),
    }
}

fn resolve_file(file: &FileRef, data: &Value) -> Option<Value> {
    let collection = get_by_path(data, &file.field)?;
    let item = match (collection, file.index) {
        (Value::Array(items), Some(index)) => items.get(index)?,
        (other, _) => other,
    };
    match (&file.key, item) {
        (Some(key), Value::Object(map)) => map.get(key).cloned(),
        _ => Some(item.clone()),
    }
}
