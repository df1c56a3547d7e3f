use serde::Deserialize;
use crate::config::ConfigError;

/// Represents the application section of the configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_schemas_path")]
    pub schemas_path: String,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::InvalidAppId);
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            id: "genstudio".to_string(),
            log_level: default_log_level(),
            schemas_path: default_schemas_path(),
        }
    }
}

/// Default log level, used when RUST_LOG is not set
fn default_log_level() -> String {
    "info".to_string()
}

/// Default schemas directory
fn default_schemas_path() -> String {
    // Resolved relative to the directory of the config file
    "schemas".to_string()
}
