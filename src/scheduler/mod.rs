//! Timer collaborator: fires jobs on cron schedules using tokio-cron-scheduler.
//!
//! The escalation sweep is registered here; the lifecycle core never
//! schedules itself.
//!
//! # Example
//!
//! ```no_run
//! use incident_flow::scheduler::{Job, JobMetadata, SchedulerService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut scheduler = SchedulerService::new().await?;
//!     scheduler
//!         .add_job(Job::new(JobMetadata::new("tick", "*/10 * * * * *"), || async { Ok(()) }))
//!         .await?;
//!     scheduler.start().await?;
//!
//!     tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
//!
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod jobs;
mod metrics;

pub use self::core::SchedulerService;
pub use error::{SchedulerError, SchedulerResult};
pub use jobs::{Job, JobId, JobMetadata};
pub use metrics::{init_scheduler_metrics, SCHEDULER_METRICS};
