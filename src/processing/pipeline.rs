use crate::error::Result;
use crate::messaging::{EventBus, IncidentEvent, Subscription};
use crate::metrics::LIFECYCLE_METRICS;
use crate::processing::{EventHandler, IncidentAssigner, IncidentClassifier};
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Running subscriptions of the classifier and assigner
pub struct IncidentPipeline {
    consumers: Vec<JoinHandle<()>>,
}

impl IncidentPipeline {
    /// Subscribe both handlers to their topics.
    ///
    /// Subscriptions are established before this returns, so events published
    /// afterwards are delivered.
    pub async fn start(
        bus: Arc<dyn EventBus>,
        classifier: Arc<IncidentClassifier>,
        assigner: Arc<IncidentAssigner>,
    ) -> Result<Self> {
        let consumers = vec![
            consume(bus.as_ref(), classifier).await?,
            consume(bus.as_ref(), assigner).await?,
        ];

        info!(consumers = consumers.len(), "Incident pipeline started");
        Ok(Self { consumers })
    }

    /// Stop consuming. Deliveries already being handled run to completion.
    pub fn shutdown(self) {
        for consumer in self.consumers {
            consumer.abort();
        }
        info!("Incident pipeline stopped");
    }
}

async fn consume<H: EventHandler>(bus: &dyn EventBus, handler: Arc<H>) -> Result<JoinHandle<()>> {
    let topic = <H::Event as IncidentEvent>::TOPIC;
    let subscription = bus.subscribe(topic).await?;
    debug!(handler = H::NAME, topic = topic, "Subscribed");

    Ok(tokio::spawn(run_consumer(subscription, handler)))
}

async fn run_consumer<H: EventHandler>(mut subscription: Subscription, handler: Arc<H>) {
    while let Some(envelope) = subscription.next().await {
        let event = match envelope.decode::<H::Event>() {
            Ok(event) => event,
            Err(e) => {
                warn!(handler = H::NAME, error = %e, "Discarding undecodable event");
                LIFECYCLE_METRICS.record_outcome(H::NAME, "rejected");
                continue;
            }
        };

        // One task per delivery.
        let handler = handler.clone();
        tokio::spawn(async move {
            let incident_id = event.incident_id().to_string();
            match handler.handle(event).await {
                Ok(outcome) => {
                    LIFECYCLE_METRICS.record_outcome(H::NAME, outcome.as_ref());
                    debug!(handler = H::NAME, incident_id = %incident_id, outcome = %outcome, "Event handled");
                }
                Err(e) => {
                    LIFECYCLE_METRICS.record_outcome(H::NAME, "failed");
                    error!(handler = H::NAME, incident_id = %incident_id, error = %e, "Event handling failed");
                }
            }
        });
    }

    debug!(handler = H::NAME, "Subscription closed");
}
