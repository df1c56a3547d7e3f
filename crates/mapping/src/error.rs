//! Error types for mapping schemas and custom functions

use thiserror::Error;

/// Result type alias for schema loading and validation
pub type Result<T> = std::result::Result<T, MappingError>;

/// Errors raised while loading or validating a mapping schema.
///
/// Evaluating a schema never fails; these only surface at load time.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Failed to read mapping schema file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse mapping schema JSON: {0}")]
    SchemaParse(#[from] serde_json::Error),

    #[error("Invalid rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },
}

impl MappingError {
    pub fn invalid_rule(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            index,
            reason: reason.into(),
        }
    }
}

/// Failure reported by a registered custom function.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CustomFnError(pub String);

impl CustomFnError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
