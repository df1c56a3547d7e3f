use serde::Deserialize;
use std::time::Duration;

use crate::config::ConfigError;

/// Limits applied to generation jobs
#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Maximum number of in-flight generation tasks per user
    #[serde(default = "default_max_concurrent_per_user")]
    pub max_concurrent_per_user: usize,

    /// Seconds after which an in-flight task is forgotten
    #[serde(default = "default_task_ttl_secs")]
    pub task_ttl_secs: u64,
}

impl LimitsConfig {
    pub fn task_ttl(&self) -> Duration {
        Duration::from_secs(self.task_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_per_user == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_concurrent_per_user must be at least 1".to_string(),
            ));
        }
        if self.task_ttl_secs == 0 {
            return Err(ConfigError::InvalidLimit(
                "task_ttl_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_user: default_max_concurrent_per_user(),
            task_ttl_secs: default_task_ttl_secs(),
        }
    }
}

fn default_max_concurrent_per_user() -> usize {
    4
}

fn default_task_ttl_secs() -> u64 {
    600
}
