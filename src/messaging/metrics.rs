//! Prometheus metrics for messaging

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

/// Messaging metrics
pub struct MessagingMetrics {
    /// Messages published counter
    pub messages_published: CounterVec,

    /// Messages consumed counter
    pub messages_consumed: CounterVec,

    /// Message publish failures
    pub publish_failures: CounterVec,
}

lazy_static! {
    pub static ref MESSAGING_METRICS: MessagingMetrics = MessagingMetrics {
        messages_published: register_counter_vec!(
            "incident_flow_messages_published_total",
            "Total number of messages published",
            &["topic", "backend"]
        )
        .unwrap(),

        messages_consumed: register_counter_vec!(
            "incident_flow_messages_consumed_total",
            "Total number of messages consumed",
            &["topic", "backend"]
        )
        .unwrap(),

        publish_failures: register_counter_vec!(
            "incident_flow_publish_failures_total",
            "Total number of publish failures",
            &["topic", "backend"]
        )
        .unwrap(),
    };
}

/// Initialize messaging metrics
pub fn init_messaging_metrics() {
    lazy_static::initialize(&MESSAGING_METRICS);
}
