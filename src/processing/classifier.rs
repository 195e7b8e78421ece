use crate::error::{AppError, Result};
use crate::messaging::{EventBus, EventBusExt, IncidentClassified, IncidentCreated};
use crate::metrics::LIFECYCLE_METRICS;
use crate::models::{Category, Incident, IncidentSource, IncidentStatus, Priority};
use crate::processing::{EventHandler, HandlerOutcome};
use crate::state::IncidentRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

const HIGH_PRIORITY_KEYWORDS: &[&str] = &["down", "outage"];
const MEDIUM_PRIORITY_KEYWORDS: &[&str] = &["slow", "latency"];

/// Category keyword groups, first match wins
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Infra, &["server", "cpu", "disk", "memory"]),
    (Category::App, &["api", "service", "deploy"]),
    (
        Category::Security,
        &["breach", "attack", "unauthorized", "security"],
    ),
];

/// Priority and category derived from an incident's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub priority: Priority,
    pub category: Category,
}

/// Classify an incident from its title, description and source.
///
/// Matching is plain substring search on the lower-cased
/// `"{title} {description}"`, so "download" counts as "down".
pub fn classify(title: &str, description: Option<&str>, source: IncidentSource) -> Classification {
    let text = format!("{} {}", title, description.unwrap_or_default()).to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(*k));

    let mut priority = if contains_any(HIGH_PRIORITY_KEYWORDS) {
        Priority::High
    } else if contains_any(MEDIUM_PRIORITY_KEYWORDS) {
        Priority::Medium
    } else {
        Priority::Low
    };

    // Monitoring alerts above LOW are always paged.
    if source == IncidentSource::Monitoring && priority != Priority::Low {
        priority = Priority::High;
    }

    let category = CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_any(*keywords))
        .map(|(category, _)| *category)
        .unwrap_or_default();

    Classification { priority, category }
}

/// Consumes `incident-created`, records the classification and publishes
/// `incident-classified`.
pub struct IncidentClassifier {
    incidents: IncidentRepository,
    bus: Arc<dyn EventBus>,
}

impl IncidentClassifier {
    pub fn new(incidents: IncidentRepository, bus: Arc<dyn EventBus>) -> Self {
        Self { incidents, bus }
    }

    /// Handle one delivery with an explicit transition time
    pub async fn handle_at(&self, event: IncidentCreated, now: DateTime<Utc>) -> Result<HandlerOutcome> {
        let mut incident = match self.incidents.load(&event.incident_id).await? {
            Some(incident) => incident,
            None => {
                debug!(incident_id = %event.incident_id, "No record for created event, rebuilding it");
                Incident::with_id(
                    event.incident_id.clone(),
                    event.title.clone(),
                    event.description.clone(),
                    event.source,
                    event.created_at,
                )
            }
        };

        match incident.status {
            IncidentStatus::Created => {
                let Classification { priority, category } =
                    classify(&event.title, event.description.as_deref(), event.source);

                incident.classify_at(priority, category, now)?;
                self.incidents.save(&incident).await?;
                LIFECYCLE_METRICS.record_transition(IncidentStatus::Classified);

                info!(
                    incident_id = %incident.id,
                    priority = %priority,
                    category = %category,
                    "Incident classified"
                );

                self.publish(&incident.id, priority).await?;
                Ok(HandlerOutcome::Applied)
            }
            IncidentStatus::Classified => {
                // Redelivery: the record is already classified, make sure the
                // downstream event went out.
                let priority = incident.priority.ok_or_else(|| {
                    AppError::CorruptedState(format!(
                        "incident {} is CLASSIFIED but has no priority",
                        incident.id
                    ))
                })?;

                debug!(incident_id = %incident.id, "Re-publishing classification");
                self.publish(&incident.id, priority).await?;
                Ok(HandlerOutcome::Replayed)
            }
            status => {
                warn!(
                    incident_id = %incident.id,
                    status = %status,
                    "Ignoring created event for incident past classification"
                );
                Ok(HandlerOutcome::Skipped)
            }
        }
    }

    async fn publish(&self, incident_id: &str, priority: Priority) -> Result<()> {
        self.bus
            .publish_event(&IncidentClassified {
                incident_id: incident_id.to_string(),
                priority,
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for IncidentClassifier {
    type Event = IncidentCreated;

    const NAME: &'static str = "classifier";

    async fn handle(&self, event: IncidentCreated) -> Result<HandlerOutcome> {
        self.handle_at(event, Utc::now()).await
    }
}
