mod app_config;
mod logging_config;
mod limits_config;
mod providers_config;
pub mod config;

pub use app_config::AppConfig;
pub use config::Config;
pub use limits_config::LimitsConfig;
pub use logging_config::LoggingConfig;
pub use providers_config::{ProviderEndpoint, ProvidersConfig};

use crate::providers::Provider;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("App id must not be empty")]
    InvalidAppId,

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid base URL for {provider}: {reason}")]
    InvalidBaseUrl { provider: Provider, reason: String },
}
