//! Prometheus metrics for the incident lifecycle.
//!
//! All metrics register with the process-wide default registry, so
//! [`gather_metrics`] also exports the messaging and scheduler families.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Gauge, Histogram,
};

/// Lifecycle metrics
pub struct LifecycleMetrics {
    /// Transitions applied, by status reached
    pub transitions: CounterVec,

    /// Handler invocations, by handler and outcome
    pub handler_outcomes: CounterVec,

    /// Completed sweeps
    pub sweeps: CounterVec,

    /// Sweep duration in seconds
    pub sweep_duration: Histogram,

    /// Ids currently awaiting escalation evaluation
    pub pending_escalations: Gauge,
}

lazy_static! {
    pub static ref LIFECYCLE_METRICS: LifecycleMetrics = LifecycleMetrics {
        transitions: register_counter_vec!(
            "incident_flow_transitions_total",
            "Total number of incident transitions applied",
            &["status"]
        )
        .unwrap(),

        handler_outcomes: register_counter_vec!(
            "incident_flow_handler_outcomes_total",
            "Event handler invocations by outcome",
            &["handler", "outcome"]
        )
        .unwrap(),

        sweeps: register_counter_vec!(
            "incident_flow_sweeps_total",
            "Total number of escalation sweeps",
            &["result"]
        )
        .unwrap(),

        sweep_duration: register_histogram!(
            "incident_flow_sweep_duration_seconds",
            "Escalation sweep duration in seconds",
            vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
        )
        .unwrap(),

        pending_escalations: register_gauge!(
            "incident_flow_pending_escalations",
            "Number of incident ids awaiting escalation evaluation"
        )
        .unwrap(),
    };
}

impl LifecycleMetrics {
    pub fn record_transition(&self, status: crate::models::IncidentStatus) {
        self.transitions
            .with_label_values(&[&status.to_string()])
            .inc();
    }

    pub fn record_outcome(&self, handler: &str, outcome: &str) {
        self.handler_outcomes
            .with_label_values(&[handler, outcome])
            .inc();
    }
}

/// Initialize lifecycle metrics (idempotent)
pub fn init_metrics() {
    lazy_static::initialize(&LIFECYCLE_METRICS);
    crate::messaging::init_messaging_metrics();
    crate::scheduler::init_scheduler_metrics();
}

/// Export all registered metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IncidentStatus;

    #[test]
    fn test_metrics_are_exported() {
        init_metrics();
        LIFECYCLE_METRICS.record_transition(IncidentStatus::Assigned);
        LIFECYCLE_METRICS.record_outcome("assigner", "applied");

        let output = gather_metrics();
        assert!(output.contains("incident_flow_transitions_total"));
        assert!(output.contains("incident_flow_handler_outcomes_total"));
    }
}
