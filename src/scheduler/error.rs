//! Error types for the scheduler module

use crate::error::AppError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

/// Errors that can occur in scheduler operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Scheduler failed to start
    #[error("Failed to start scheduler: {0}")]
    StartupFailed(String),

    /// Scheduler failed to shutdown
    #[error("Failed to shutdown scheduler: {0}")]
    ShutdownFailed(String),

    /// Job creation failed (including invalid cron expressions)
    #[error("Failed to create job: {0}")]
    JobCreationFailed(String),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(String),
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::JobNotFound(msg) => AppError::NotFound(msg),
            _ => AppError::Scheduler(err.to_string()),
        }
    }
}
