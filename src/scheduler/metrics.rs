//! Prometheus metrics for the scheduler module

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, GaugeVec,
    HistogramVec,
};

/// Scheduler metrics collection
pub struct SchedulerMetrics {
    /// Number of job executions
    pub executions_total: CounterVec,

    /// Number of failed job executions
    pub executions_failed: CounterVec,

    /// Job execution duration in seconds
    pub execution_duration: HistogramVec,

    /// Number of currently running executions; above one when runs overlap
    pub running_jobs: GaugeVec,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self {
            executions_total: register_counter_vec!(
                "incident_flow_scheduler_executions_total",
                "Total number of job executions",
                &["job_name"]
            )
            .unwrap(),

            executions_failed: register_counter_vec!(
                "incident_flow_scheduler_executions_failed_total",
                "Total number of failed job executions",
                &["job_name"]
            )
            .unwrap(),

            execution_duration: register_histogram_vec!(
                "incident_flow_scheduler_execution_duration_seconds",
                "Job execution duration in seconds",
                &["job_name"],
                vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]
            )
            .unwrap(),

            running_jobs: register_gauge_vec!(
                "incident_flow_scheduler_running_jobs",
                "Number of currently running job executions",
                &["job_name"]
            )
            .unwrap(),
        }
    }

    /// Record job execution start
    pub fn record_execution_start(&self, job_name: &str) {
        self.running_jobs.with_label_values(&[job_name]).inc();
    }

    /// Record job execution completion
    pub fn record_execution_complete(&self, job_name: &str, success: bool, duration_secs: f64) {
        self.running_jobs.with_label_values(&[job_name]).dec();
        self.executions_total.with_label_values(&[job_name]).inc();

        if !success {
            self.executions_failed.with_label_values(&[job_name]).inc();
        }

        self.execution_duration
            .with_label_values(&[job_name])
            .observe(duration_secs);
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// Global scheduler metrics instance
    pub static ref SCHEDULER_METRICS: SchedulerMetrics = SchedulerMetrics::new();
}

/// Initialize scheduler metrics (idempotent)
pub fn init_scheduler_metrics() {
    lazy_static::initialize(&SCHEDULER_METRICS);
}
