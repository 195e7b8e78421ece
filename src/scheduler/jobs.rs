//! Job definitions

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a scheduled job
pub type JobId = Uuid;

/// Execution statistics of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobMetadata {
    /// Unique job identifier
    pub id: JobId,

    /// Human-readable job name
    pub name: String,

    /// Cron expression (with seconds)
    pub schedule: String,

    /// When the job last finished
    pub last_run: Option<DateTime<Utc>>,

    /// Number of finished runs
    pub run_count: u64,

    /// Number of failed runs
    pub failure_count: u64,
}

impl JobMetadata {
    pub fn new(name: impl Into<String>, schedule: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            schedule: schedule.into(),
            last_run: None,
            run_count: 0,
            failure_count: 0,
        }
    }

    pub fn update_execution(&mut self, success: bool) {
        self.run_count += 1;
        if !success {
            self.failure_count += 1;
        }
        self.last_run = Some(Utc::now());
    }
}

type JobFn = dyn Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync;

/// A scheduled job.
///
/// Runs are not serialized: if a run outlasts the period, the next tick
/// starts another one concurrently.
pub struct Job {
    /// Job metadata
    pub metadata: Arc<tokio::sync::RwLock<JobMetadata>>,

    execute: Arc<JobFn>,
}

impl Job {
    pub fn new<F, Fut>(metadata: JobMetadata, execute: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        Self {
            metadata: Arc::new(tokio::sync::RwLock::new(metadata)),
            execute: Arc::new(move || Box::pin(execute())),
        }
    }

    pub async fn get_metadata(&self) -> JobMetadata {
        self.metadata.read().await.clone()
    }

    /// Run the job once and record the outcome
    pub async fn execute(&self) -> Result<(), String> {
        let result = (self.execute)().await;

        self.metadata
            .write()
            .await
            .update_execution(result.is_ok());

        result
    }
}
