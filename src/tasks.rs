//! In-flight generation task bookkeeping.
//!
//! Tasks live in memory for at most `ttl`; anything older is considered
//! abandoned and no longer counts against the per-user limit.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::providers::{JobHandle, Provider};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("User '{user_id}' already has {limit} generation tasks in flight")]
    LimitReached { user_id: String, limit: usize },

    #[error("Unknown task: {0}")]
    UnknownTask(Uuid),

    #[error("Task {0} has not been accepted by a provider yet")]
    NotSubmitted(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationTask {
    pub id: Uuid,
    pub user_id: String,
    pub model: String,
    pub provider: Provider,
    /// Set once the provider accepted the job
    pub job: Option<JobHandle>,
    pub created_at: DateTime<Utc>,
}

impl GenerationTask {
    fn expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at >= ttl
    }
}

#[derive(Debug)]
pub struct TaskStore {
    ttl: Duration,
    max_per_user: usize,
    tasks: Mutex<Vec<GenerationTask>>,
}

impl TaskStore {
    pub fn new(ttl: std::time::Duration, max_per_user: usize) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::weeks(52 * 100)),
            max_per_user,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn from_limits(limits: &LimitsConfig) -> Self {
        Self::new(limits.task_ttl(), limits.max_concurrent_per_user)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<GenerationTask>> {
        // A panic while holding the lock cannot leave the list half-updated
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim a slot for `user_id`, failing when the user is at the limit
    pub fn reserve(&self, user_id: &str, model: &str, provider: Provider) -> Result<Uuid, TaskError> {
        self.reserve_at(user_id, model, provider, Utc::now())
    }

    pub fn reserve_at(
        &self,
        user_id: &str,
        model: &str,
        provider: Provider,
        now: DateTime<Utc>,
    ) -> Result<Uuid, TaskError> {
        let mut tasks = self.lock();
        tasks.retain(|task| !task.expired_at(now, self.ttl));

        let in_flight = tasks.iter().filter(|task| task.user_id == user_id).count();
        if in_flight >= self.max_per_user {
            return Err(TaskError::LimitReached {
                user_id: user_id.to_string(),
                limit: self.max_per_user,
            });
        }

        let id = Uuid::new_v4();
        tasks.push(GenerationTask {
            id,
            user_id: user_id.to_string(),
            model: model.to_string(),
            provider,
            job: None,
            created_at: now,
        });
        tracing::debug!("Reserved task {} for user {} ({} in flight)", id, user_id, in_flight + 1);
        Ok(id)
    }

    pub fn attach_job(&self, id: Uuid, job: JobHandle) -> Result<(), TaskError> {
        let mut tasks = self.lock();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(TaskError::UnknownTask(id))?;
        task.job = Some(job);
        Ok(())
    }

    /// Put back a task whose job is already live at the provider.
    ///
    /// Bypasses the per-user limit; the slot was claimed before submission.
    pub fn readmit(&self, task: GenerationTask) {
        let mut tasks = self.lock();
        tasks.retain(|existing| existing.id != task.id);
        tasks.push(task);
    }

    /// Remove a finished or abandoned task, freeing its slot
    pub fn complete(&self, id: Uuid) -> Option<GenerationTask> {
        let mut tasks = self.lock();
        let index = tasks.iter().position(|task| task.id == id)?;
        Some(tasks.remove(index))
    }

    pub fn get(&self, id: Uuid) -> Option<GenerationTask> {
        self.lock().iter().find(|task| task.id == id).cloned()
    }

    pub fn active_for(&self, user_id: &str) -> Vec<GenerationTask> {
        self.active_for_at(user_id, Utc::now())
    }

    pub fn active_for_at(&self, user_id: &str, now: DateTime<Utc>) -> Vec<GenerationTask> {
        self.lock()
            .iter()
            .filter(|task| task.user_id == user_id && !task.expired_at(now, self.ttl))
            .cloned()
            .collect()
    }

    /// Drop expired tasks, returning how many were removed
    pub fn prune_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|task| !task.expired_at(now, self.ttl));
        before - tasks.len()
    }
}
