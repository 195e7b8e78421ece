//! Event bus used by the incident pipeline
//!
//! Components never call each other directly: the inbound boundary publishes
//! `incident-created`, the classifier consumes it and publishes
//! `incident-classified`, and the assigner consumes that.
//!
//! ```text
//!  POST /v1/incidents ──► incident-created ──► IncidentClassifier
//!                                                   │
//!                         incident-classified ◄─────┘
//!                                  │
//!                                  ▼
//!                          IncidentAssigner ──► EscalationRegistry
//! ```
//!
//! Two backends implement [`EventBus`]: an in-process bus with a queue per
//! subscriber, and core NATS.

mod error;
mod events;
mod memory;
mod metrics;
mod nats;
mod traits;

pub use error::{MessagingError, MessagingResult};
pub use events::{
    IncidentClassified, IncidentCreated, IncidentEvent, MessageEnvelope, MessageMetadata,
    INCIDENT_CLASSIFIED_TOPIC, INCIDENT_CREATED_TOPIC,
};
pub use memory::InMemoryEventBus;
pub use metrics::{init_messaging_metrics, MESSAGING_METRICS};
pub use nats::NatsEventBus;
pub use traits::{EventBus, EventBusExt, Subscription};

use crate::config::{MessagingBackend, MessagingConfig};
use std::sync::Arc;

/// Create an event bus based on configuration
pub async fn create_event_bus(config: &MessagingConfig) -> MessagingResult<Arc<dyn EventBus>> {
    init_messaging_metrics();

    match config.backend {
        MessagingBackend::InMemory => {
            tracing::info!(capacity = config.channel_capacity, "Initializing in-memory event bus");
            Ok(Arc::new(InMemoryEventBus::new(config.channel_capacity)))
        }
        MessagingBackend::Nats => {
            let bus = NatsEventBus::connect(config.clone()).await?;
            Ok(Arc::new(bus))
        }
    }
}
