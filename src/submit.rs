//! Generation submission: schema lookup, payload mapping, provider hand-off.

use chrono::Utc;
use genstudio_mapping::MappingEngine;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::providers::{GenerationClient, GenerationRequest, JobHandle, JobStatus, Provider, ProviderError};
use crate::registry::SchemaRegistry;
use crate::tasks::{GenerationTask, TaskError, TaskStore};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("No mapping schema registered for model '{0}'")]
    UnknownModel(String),

    #[error("No client configured for provider '{0}'")]
    NoClient(Provider),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result of a successful submission
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub task_id: Uuid,
    pub job: JobHandle,
}

pub struct Submitter {
    registry: Arc<SchemaRegistry>,
    engine: MappingEngine,
    tasks: Arc<TaskStore>,
    default_provider: Provider,
    clients: HashMap<Provider, Arc<dyn GenerationClient>>,
}

impl Submitter {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        engine: MappingEngine,
        tasks: Arc<TaskStore>,
        default_provider: Provider,
    ) -> Self {
        Self {
            registry,
            engine,
            tasks,
            default_provider,
            clients: HashMap::new(),
        }
    }

    pub fn with_client(mut self, client: Arc<dyn GenerationClient>) -> Self {
        self.clients.insert(client.provider(), client);
        self
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    /// Provider a submission for `model` would go to
    pub fn provider_for(&self, model: &str) -> Result<Provider, SubmitError> {
        let schema = self
            .registry
            .get(model)
            .ok_or_else(|| SubmitError::UnknownModel(model.to_string()))?;
        Ok(schema.provider.unwrap_or(self.default_provider))
    }

    /// Map `data` into the payload for `model` without sending anything
    pub fn prepare(&self, model: &str, data: &Value) -> Result<GenerationRequest, SubmitError> {
        let schema = self
            .registry
            .get(model)
            .ok_or_else(|| SubmitError::UnknownModel(model.to_string()))?;

        let input = self.engine.build(&schema.mapping, data);
        Ok(GenerationRequest {
            model: schema.model.clone(),
            provider: schema.provider.unwrap_or(self.default_provider),
            version: schema.version.clone(),
            input,
        })
    }

    /// Map and submit a generation for `user_id`.
    ///
    /// The user's slot is claimed before the network call and released again
    /// if the provider rejects the job.
    pub async fn submit(&self, user_id: &str, model: &str, data: &Value) -> Result<Submission, SubmitError> {
        let request = self.prepare(model, data)?;
        let client = self
            .clients
            .get(&request.provider)
            .ok_or(SubmitError::NoClient(request.provider))?;

        let task_id = self.tasks.reserve(user_id, &request.model, request.provider)?;
        tracing::info!(
            "Submitting {} to {} for user {} (task {})",
            request.model,
            request.provider,
            user_id,
            task_id
        );

        let job = match client.submit(&request).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("Submission of {} failed: {}", request.model, e);
                self.tasks.complete(task_id);
                return Err(e.into());
            }
        };

        if let Err(e) = self.tasks.attach_job(task_id, job.clone()) {
            // The job is live regardless; track it again so it can be polled
            tracing::warn!("Task {} vanished during submission ({}), readmitting", task_id, e);
            self.tasks.readmit(GenerationTask {
                id: task_id,
                user_id: user_id.to_string(),
                model: request.model.clone(),
                provider: request.provider,
                job: Some(job.clone()),
                created_at: Utc::now(),
            });
        }
        Ok(Submission { task_id, job })
    }

    /// Poll a task's job, releasing the task once it reaches a terminal state
    pub async fn poll(&self, task_id: Uuid) -> Result<JobStatus, SubmitError> {
        let task = self.tasks.get(task_id).ok_or(TaskError::UnknownTask(task_id))?;
        let job = task.job.ok_or(TaskError::NotSubmitted(task_id))?;
        let client = self
            .clients
            .get(&job.provider)
            .ok_or(SubmitError::NoClient(job.provider))?;

        let status = client.status(&job).await?;
        if status.is_terminal() {
            tracing::info!("Task {} finished with status {:?}", task_id, status);
            self.tasks.complete(task_id);
        }
        Ok(status)
    }
}
