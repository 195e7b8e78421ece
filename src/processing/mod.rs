//! Event handlers of the incident lifecycle and the inbound boundary.

pub mod assigner;
pub mod classifier;
pub mod pipeline;
pub mod processor;

pub use assigner::{route_team, IncidentAssigner};
pub use classifier::{classify, Classification, IncidentClassifier};
pub use pipeline::IncidentPipeline;
pub use processor::IncidentProcessor;

use crate::error::Result;
use crate::messaging::IncidentEvent;
use async_trait::async_trait;
use strum::{AsRefStr, Display};

/// What a handler did with one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum HandlerOutcome {
    /// The transition was applied
    Applied,

    /// Redelivery of an already-applied transition; no new timeline entry
    Replayed,

    /// Nothing to do for the incident's current status
    Skipped,
}

/// Subscriber for one event type
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    type Event: IncidentEvent + 'static;

    /// Label used in logs and metrics
    const NAME: &'static str;

    async fn handle(&self, event: Self::Event) -> Result<HandlerOutcome>;
}
