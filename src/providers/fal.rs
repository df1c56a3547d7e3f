use async_trait::async_trait;
use serde::Deserialize;

use crate::providers::{
    join_url, read_json, GenerationClient, GenerationRequest, JobHandle, JobStatus, Provider,
    ProviderError,
};

/// fal.ai queue API client
pub struct FalClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct QueueSubmitResponse {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueStatusResponse {
    status: String,
}

impl FalClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn submit_url(&self, model: &str) -> String {
        join_url(&self.base_url, model)
    }

    /// Status lives under the app id (`owner/app`), not the full endpoint path
    fn status_url(&self, model: &str, request_id: &str) -> String {
        let app_id: Vec<&str> = model.trim_matches('/').splitn(3, '/').take(2).collect();
        join_url(
            &self.base_url,
            &format!("{}/requests/{}/status", app_id.join("/"), request_id),
        )
    }
}

pub(crate) fn parse_status(status: &str) -> JobStatus {
    match status {
        "IN_QUEUE" => JobStatus::Queued,
        "IN_PROGRESS" => JobStatus::InProgress,
        "COMPLETED" => JobStatus::Completed,
        _ => JobStatus::Failed,
    }
}

#[async_trait]
impl GenerationClient for FalClient {
    fn provider(&self) -> Provider {
        Provider::Fal
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, ProviderError> {
        let url = self.submit_url(&request.model);
        tracing::info!("Submitting fal job to {}", url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&request.input)
            .send()
            .await?;
        let body: QueueSubmitResponse = read_json(response).await?;

        Ok(JobHandle {
            provider: Provider::Fal,
            model: request.model.clone(),
            request_id: body.request_id,
            status_url: body.status_url,
            response_url: body.response_url,
        })
    }

    async fn status(&self, job: &JobHandle) -> Result<JobStatus, ProviderError> {
        let url = job
            .status_url
            .clone()
            .unwrap_or_else(|| self.status_url(&job.model, &job.request_id));

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await?;
        let body: QueueStatusResponse = read_json(response).await?;
        Ok(parse_status(&body.status))
    }
}
