//! Clients for the external generation services.
//!
//! Each provider receives the payload produced by the mapping engine verbatim.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ProvidersConfig;

pub mod fal;
pub mod replicate;

pub use fal::FalClient;
pub use replicate::ReplicateClient;

/// External generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Fal,
    Replicate,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Fal => write!(f, "fal"),
            Provider::Replicate => write!(f, "replicate"),
        }
    }
}

impl FromStr for Provider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fal" => Ok(Provider::Fal),
            "replicate" => Ok(Provider::Replicate),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Error type for provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("API key environment variable '{0}' is not set")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// A mapped payload ready to be sent to a provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub provider: Provider,
    /// Replicate model version, when pinned
    pub version: Option<String>,
    pub input: Value,
}

/// Handle to a job accepted by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    pub provider: Provider,
    pub model: String,
    pub request_id: String,
    pub status_url: Option<String>,
    pub response_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled)
    }
}

/// Network collaborator that accepts generation jobs
#[async_trait]
pub trait GenerationClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Submit a job and return its handle without waiting for completion
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, ProviderError>;

    async fn status(&self, job: &JobHandle) -> Result<JobStatus, ProviderError>;
}

/// Create the client for `provider` from configuration.
///
/// Reads the API key from the configured environment variable.
pub fn build_client(
    provider: Provider,
    config: &ProvidersConfig,
) -> Result<Arc<dyn GenerationClient>, ProviderError> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;
    let endpoint = config.endpoint(provider);
    let api_key = api_key_from_env(&endpoint.api_key_env)?;

    let client: Arc<dyn GenerationClient> = match provider {
        Provider::Fal => Arc::new(FalClient::new(http, &endpoint.base_url, api_key)),
        Provider::Replicate => Arc::new(ReplicateClient::new(http, &endpoint.base_url, api_key)),
    };
    Ok(client)
}

fn api_key_from_env(var: &str) -> Result<String, ProviderError> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ProviderError::MissingApiKey(var.to_string()))
}

/// Decode a JSON response body, turning non-2xx statuses into errors
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<T>().await?)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
