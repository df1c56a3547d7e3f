use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::ConfigError;
use crate::providers::Provider;

/// Connection settings for one generation provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl ProviderEndpoint {
    fn validate(&self, provider: Provider) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            provider,
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                provider,
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    /// Provider used for schemas that do not name one
    #[serde(default)]
    pub default: Provider,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_fal")]
    pub fal: ProviderEndpoint,

    #[serde(default = "default_replicate")]
    pub replicate: ProviderEndpoint,
}

impl ProvidersConfig {
    pub fn endpoint(&self, provider: Provider) -> &ProviderEndpoint {
        match provider {
            Provider::Fal => &self.fal,
            Provider::Replicate => &self.replicate,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidLimit(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.fal.validate(Provider::Fal)?;
        self.replicate.validate(Provider::Replicate)?;
        Ok(())
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default: Provider::default(),
            request_timeout_secs: default_request_timeout_secs(),
            fal: default_fal(),
            replicate: default_replicate(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_fal() -> ProviderEndpoint {
    ProviderEndpoint {
        base_url: "https://queue.fal.run".to_string(),
        api_key_env: "FAL_KEY".to_string(),
    }
}

fn default_replicate() -> ProviderEndpoint {
    ProviderEndpoint {
        base_url: "https://api.replicate.com/v1".to_string(),
        api_key_env: "REPLICATE_API_TOKEN".to_string(),
    }
}
