//! In-process event bus with one bounded queue per subscriber

use crate::messaging::error::MessagingResult;
use crate::messaging::events::MessageEnvelope;
use crate::messaging::metrics::MESSAGING_METRICS;
use crate::messaging::traits::{EventBus, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

const BACKEND: &str = "in_memory";

/// In-memory event bus.
///
/// Every subscriber owns a queue of `capacity` envelopes. A full queue makes
/// `publish` wait for the subscriber to catch up, so deliveries are never
/// overwritten.
#[derive(Clone)]
pub struct InMemoryEventBus {
    topics: Arc<DashMap<String, Vec<mpsc::Sender<MessageEnvelope>>>>,
    capacity: usize,
}

impl InMemoryEventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Live senders for a topic, pruning subscribers that went away
    fn senders(&self, topic: &str) -> Vec<mpsc::Sender<MessageEnvelope>> {
        match self.topics.get_mut(topic) {
            Some(mut senders) => {
                senders.retain(|tx| !tx.is_closed());
                senders.clone()
            }
            None => Vec::new(),
        }
    }

    /// Number of live subscribers on a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, payload: Value) -> MessagingResult<()> {
        let envelope = MessageEnvelope::new(topic, payload);
        let senders = self.senders(topic);

        // Fire-and-forget: no subscriber is not an error.
        if senders.is_empty() {
            debug!(topic = topic, "Event published with no subscribers");
        }

        let mut delivered = 0usize;
        for tx in senders {
            match tx.send(envelope.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => debug!(topic = topic, "Subscriber closed before delivery"),
            }
        }
        if delivered > 0 {
            debug!(topic = topic, receivers = delivered, "Event published");
        }

        MESSAGING_METRICS
            .messages_published
            .with_label_values(&[topic, BACKEND])
            .inc();
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> MessagingResult<Subscription> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.topics.entry(topic.to_string()).or_default().push(tx);
        let topic = topic.to_string();

        let stream = ReceiverStream::new(rx).map(move |envelope| {
            MESSAGING_METRICS
                .messages_consumed
                .with_label_values(&[&topic, BACKEND])
                .inc();
            envelope
        });

        Ok(stream.boxed())
    }
}
