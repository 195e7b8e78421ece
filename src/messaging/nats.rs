//! NATS event bus implementation

use crate::config::MessagingConfig;
use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::events::MessageEnvelope;
use crate::messaging::metrics::MESSAGING_METRICS;
use crate::messaging::traits::{EventBus, Subscription};
use async_nats::Client;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tracing::warn;

const BACKEND: &str = "nats";

/// Event bus over core NATS subjects (`<topic_prefix>.<topic>`)
pub struct NatsEventBus {
    client: Client,
    config: MessagingConfig,
}

impl NatsEventBus {
    /// Connect to the configured NATS server
    pub async fn connect(config: MessagingConfig) -> MessagingResult<Self> {
        let url = config.nats_url.clone().ok_or_else(|| {
            MessagingError::ConfigurationError(
                "NATS backend requires 'nats_url' configuration".to_string(),
            )
        })?;

        let client = async_nats::connect(&url)
            .await
            .map_err(|e| MessagingError::ConnectionFailed(format!("NATS connection failed: {}", e)))?;

        tracing::info!(url = %url, "Connected to NATS");

        Ok(Self { client, config })
    }
}

#[async_trait]
impl EventBus for NatsEventBus {
    async fn publish(&self, topic: &str, payload: Value) -> MessagingResult<()> {
        let envelope = MessageEnvelope::new(topic, payload);
        let bytes = serde_json::to_vec(&envelope)?;

        let result = self
            .client
            .publish(self.config.full_topic(topic), bytes.into())
            .await
            .map_err(|e| MessagingError::PublishFailed(format!("NATS publish failed: {}", e)));

        match &result {
            Ok(()) => MESSAGING_METRICS
                .messages_published
                .with_label_values(&[topic, BACKEND])
                .inc(),
            Err(_) => MESSAGING_METRICS
                .publish_failures
                .with_label_values(&[topic, BACKEND])
                .inc(),
        }

        result
    }

    async fn subscribe(&self, topic: &str) -> MessagingResult<Subscription> {
        let subscriber = self
            .client
            .subscribe(self.config.full_topic(topic))
            .await
            .map_err(|e| MessagingError::SubscribeFailed(format!("NATS subscribe failed: {}", e)))?;

        let topic = topic.to_string();
        let stream = subscriber.filter_map(move |msg| {
            let topic = topic.clone();
            async move {
                match serde_json::from_slice::<MessageEnvelope>(&msg.payload) {
                    Ok(envelope) => {
                        MESSAGING_METRICS
                            .messages_consumed
                            .with_label_values(&[&topic, BACKEND])
                            .inc();
                        Some(envelope)
                    }
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "Dropping malformed NATS message");
                        None
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}
