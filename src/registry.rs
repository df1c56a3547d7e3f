//! Model identifier -> mapping schema lookup.

use genstudio_mapping::{FunctionRegistry, MappingError, MappingSchema};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

use crate::providers::Provider;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read schema file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse schema file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid schema for model '{model}': {source}")]
    Invalid { model: String, source: MappingError },

    #[error("Model id must not be empty")]
    EmptyModelId,

    #[error("Duplicate schema for model '{0}'")]
    Duplicate(String),

    #[error("Failed to scan schemas directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Mapping schema bound to one provider endpoint.
///
/// On disk: `{"model": "fal-ai/flux/dev", "provider": "fal", "rules": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSchema {
    pub model: String,
    /// Falls back to the configured default provider when absent
    #[serde(default)]
    pub provider: Option<Provider>,
    /// Pinned Replicate version
    #[serde(default)]
    pub version: Option<String>,
    #[serde(flatten)]
    pub mapping: MappingSchema,
}

/// Registry of model schemas, built once at startup and shared read-only.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<ModelSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file under `dir`, recursively.
    pub fn load_dir<P: AsRef<Path>>(dir: P, functions: &FunctionRegistry) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir.as_ref()) {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path.to_path_buf());
            }
        }
        // Deterministic order, so duplicate errors name the same file each run
        paths.sort();

        for path in paths {
            let schema = Self::read_schema(&path)?;
            registry.insert(schema, functions)?;
        }

        tracing::info!(
            "Loaded {} model schemas from {}",
            registry.len(),
            dir.as_ref().display()
        );
        Ok(registry)
    }

    fn read_schema(path: &Path) -> Result<ModelSchema, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate and add a schema.
    ///
    /// `customFn` names missing from `functions` are reported but accepted;
    /// at run time they pass values through unchanged.
    pub fn insert(&mut self, schema: ModelSchema, functions: &FunctionRegistry) -> Result<(), RegistryError> {
        if schema.model.trim().is_empty() {
            return Err(RegistryError::EmptyModelId);
        }
        schema
            .mapping
            .validate()
            .map_err(|source| RegistryError::Invalid {
                model: schema.model.clone(),
                source,
            })?;
        if self.schemas.contains_key(&schema.model) {
            return Err(RegistryError::Duplicate(schema.model));
        }

        for name in schema.mapping.custom_function_names() {
            if !functions.contains(name) {
                tracing::warn!(
                    model = %schema.model,
                    function = %name,
                    "Schema references an unregistered custom function"
                );
            }
        }

        tracing::debug!(
            "Registered schema for {} ({} rules)",
            schema.model,
            schema.mapping.rules.len()
        );
        self.schemas.insert(schema.model.clone(), Arc::new(schema));
        Ok(())
    }

    pub fn get(&self, model: &str) -> Option<Arc<ModelSchema>> {
        self.schemas.get(model).cloned()
    }

    /// Registered model ids, sorted
    pub fn model_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> ModelSchema {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_model_schema_flattens_rules() {
        let parsed = schema(json!({
            "model": "stability-ai/sdxl",
            "provider": "replicate",
            "version": "39ed52f2",
            "rules": [{"to": "prompt", "from": "prompt"}]
        }));
        assert_eq!(parsed.provider, Some(Provider::Replicate));
        assert_eq!(parsed.version.as_deref(), Some("39ed52f2"));
        assert_eq!(parsed.mapping.rules.len(), 1);
    }

    #[test]
    fn test_insert_and_get() {
        let mut registry = SchemaRegistry::new();
        let functions = FunctionRegistry::new();
        registry
            .insert(schema(json!({"model": "b/model", "rules": []})), &functions)
            .unwrap();
        registry
            .insert(schema(json!({"model": "a/model", "rules": []})), &functions)
            .unwrap();

        assert_eq!(registry.model_ids(), vec!["a/model", "b/model"]);
        assert!(registry.get("a/model").is_some());
        assert!(registry.get("c/model").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = SchemaRegistry::new();
        let functions = FunctionRegistry::new();
        registry
            .insert(schema(json!({"model": "m", "rules": []})), &functions)
            .unwrap();
        let err = registry
            .insert(schema(json!({"model": "m", "rules": []})), &functions)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(id) if id == "m"));
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .insert(
                schema(json!({"model": "m", "rules": [{"to": ""}]})),
                &FunctionRegistry::new(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Invalid { .. }));
    }

    #[test]
    fn test_unregistered_function_is_accepted() {
        let mut registry = SchemaRegistry::new();
        registry
            .insert(
                schema(json!({
                    "model": "m",
                    "rules": [{"to": "x", "from": "x", "transform": [{"op": "customFn", "fn": "nope"}]}]
                })),
                &FunctionRegistry::new(),
            )
            .unwrap();
        assert_eq!(registry.len(), 1);
    }
}
