use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, ConfigError, LimitsConfig, LoggingConfig, ProvidersConfig};

/// Top-level application configuration, loaded from TOML
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Directory of the loaded config file, used to resolve relative paths
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Config {
    /// Parse and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.app.validate()?;
        self.limits.validate()?;
        self.providers.validate()?;
        Ok(())
    }

    /// Schemas directory, resolved against the config file location
    pub fn schemas_dir(&self) -> PathBuf {
        let configured = Path::new(&self.app.schemas_path);
        match &self.base_dir {
            Some(base) if configured.is_relative() => base.join(configured),
            _ => configured.to_path_buf(),
        }
    }
}
