//! Event bus trait abstractions

use crate::messaging::error::MessagingResult;
use crate::messaging::events::{IncidentEvent, MessageEnvelope};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

/// Stream of messages delivered to one subscriber
pub type Subscription = BoxStream<'static, MessageEnvelope>;

/// Asynchronous publish/subscribe transport.
///
/// Delivery is at-least-once and unordered, even for events about the same
/// incident; subscribers must recompute state from the store.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a payload to a topic
    async fn publish(&self, topic: &str, payload: Value) -> MessagingResult<()>;

    /// Subscribe to a topic
    async fn subscribe(&self, topic: &str) -> MessagingResult<Subscription>;
}

/// Typed helpers available on every bus
#[async_trait]
pub trait EventBusExt: EventBus {
    /// Publish a typed event on its topic
    async fn publish_event<E: IncidentEvent + 'static>(&self, event: &E) -> MessagingResult<()> {
        let envelope = MessageEnvelope::from_event(event)?;
        self.publish(E::TOPIC, envelope.payload).await
    }
}

impl<B: EventBus + ?Sized> EventBusExt for B {}
