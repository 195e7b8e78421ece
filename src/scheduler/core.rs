//! Core scheduler service implementation

use super::{
    error::{SchedulerError, SchedulerResult},
    jobs::{Job, JobId, JobMetadata},
    metrics::SCHEDULER_METRICS,
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio_cron_scheduler::{JobScheduler, JobSchedulerError};
use tracing::{debug, error, info, warn};

/// Timer service that fires registered jobs on their cron schedules
pub struct SchedulerService {
    /// Underlying tokio-cron-scheduler instance
    scheduler: JobScheduler,

    /// Registered jobs
    jobs: Arc<DashMap<JobId, Arc<Job>>>,

    /// Whether the scheduler is running
    running: bool,
}

impl SchedulerService {
    /// Create a new scheduler service
    pub async fn new() -> SchedulerResult<Self> {
        info!("Initializing scheduler service");

        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;

        Ok(Self {
            scheduler,
            jobs: Arc::new(DashMap::new()),
            running: false,
        })
    }

    /// Start the scheduler
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.running {
            warn!("Scheduler is already running");
            return Ok(());
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;
        self.running = true;

        info!(jobs = self.jobs.len(), "Scheduler service started");
        Ok(())
    }

    /// Stop the scheduler
    pub async fn shutdown(&mut self) -> SchedulerResult<()> {
        if !self.running {
            warn!("Scheduler is not running");
            return Ok(());
        }

        self.scheduler
            .shutdown()
            .await
            .map_err(|e| SchedulerError::ShutdownFailed(e.to_string()))?;
        self.running = false;

        info!("Scheduler service shut down successfully");
        Ok(())
    }

    /// Add a new job to the scheduler
    pub async fn add_job(&self, job: Job) -> SchedulerResult<JobId> {
        let metadata = job.get_metadata().await;
        let job_id = metadata.id;
        let job_name = metadata.name.clone();

        info!(job_id = %job_id, job_name = %job_name, schedule = %metadata.schedule, "Adding job to scheduler");

        let job = Arc::new(job);
        let job_ref = job.clone();
        let cron_job =
            tokio_cron_scheduler::Job::new_async(metadata.schedule.as_str(), move |_uuid, _l| {
                let job = job_ref.clone();
                Box::pin(async move {
                    let job_name = job.get_metadata().await.name;

                    debug!(job_name = %job_name, "Executing scheduled job");
                    SCHEDULER_METRICS.record_execution_start(&job_name);

                    let start = std::time::Instant::now();
                    let result = job.execute().await;
                    let duration = start.elapsed();

                    SCHEDULER_METRICS.record_execution_complete(
                        &job_name,
                        result.is_ok(),
                        duration.as_secs_f64(),
                    );

                    match result {
                        Ok(()) => debug!(
                            job_name = %job_name,
                            duration_ms = duration.as_millis() as u64,
                            "Job executed successfully"
                        ),
                        Err(e) => error!(
                            job_name = %job_name,
                            error = %e,
                            duration_ms = duration.as_millis() as u64,
                            "Job execution failed"
                        ),
                    }
                })
            })
            .map_err(|e: JobSchedulerError| SchedulerError::JobCreationFailed(e.to_string()))?;

        self.scheduler
            .add(cron_job)
            .await
            .map_err(|e| SchedulerError::JobCreationFailed(e.to_string()))?;

        self.jobs.insert(job_id, job);
        Ok(job_id)
    }

    /// Get job metadata
    pub async fn get_job_metadata(&self, job_id: &JobId) -> SchedulerResult<JobMetadata> {
        let job = self
            .jobs
            .get(job_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;

        Ok(job.get_metadata().await)
    }

    /// List all jobs
    pub async fn list_jobs(&self) -> Vec<JobMetadata> {
        let jobs: Vec<Arc<Job>> = self.jobs.iter().map(|entry| entry.value().clone()).collect();

        let mut metadata = Vec::with_capacity(jobs.len());
        for job in jobs {
            metadata.push(job.get_metadata().await);
        }
        metadata
    }

    /// Check if scheduler is running
    pub fn is_running(&self) -> bool {
        self.running
    }
}
