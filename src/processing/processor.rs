use crate::error::{AppError, Result};
use crate::escalation::EscalationRegistry;
use crate::messaging::{EventBus, EventBusExt, IncidentCreated};
use crate::metrics::LIFECYCLE_METRICS;
use crate::models::{Incident, IncidentSource, IncidentStatus};
use crate::state::IncidentRepository;
use chrono::Utc;
use std::sync::Arc;

/// Inbound boundary of the lifecycle: creation, lookup and resolution
pub struct IncidentProcessor {
    incidents: IncidentRepository,
    bus: Arc<dyn EventBus>,
    registry: EscalationRegistry,
}

impl IncidentProcessor {
    pub fn new(incidents: IncidentRepository, bus: Arc<dyn EventBus>, registry: EscalationRegistry) -> Self {
        Self {
            incidents,
            bus,
            registry,
        }
    }

    /// Persist a CREATED record and publish `incident-created`
    pub async fn create_incident(
        &self,
        title: String,
        description: Option<String>,
        source: IncidentSource,
    ) -> Result<Incident> {
        if title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }

        let incident = Incident::new(title, description, source);
        self.incidents.save(&incident).await?;
        LIFECYCLE_METRICS.record_transition(IncidentStatus::Created);

        tracing::info!(
            incident_id = %incident.id,
            source = %incident.source,
            "Incident created"
        );

        self.bus
            .publish_event(&IncidentCreated {
                incident_id: incident.id.clone(),
                created_at: incident.created_at,
                title: incident.title.clone(),
                description: incident.description.clone(),
                source: incident.source,
            })
            .await?;

        Ok(incident)
    }

    /// Get the full record for an id
    pub async fn get_incident(&self, id: &str) -> Result<Incident> {
        self.incidents
            .load(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Incident {} not found", id)))
    }

    /// Move an incident to RESOLVED and stop tracking it for escalation
    pub async fn resolve_incident(&self, id: &str) -> Result<Incident> {
        let mut incident = self.get_incident(id).await?;
        incident.resolve_at(Utc::now())?;
        self.incidents.save(&incident).await?;
        LIFECYCLE_METRICS.record_transition(IncidentStatus::Resolved);

        tracing::info!(incident_id = %incident.id, "Incident resolved");

        // The sweeper drops resolved ids on its own; this only keeps the set tidy.
        if let Err(e) = self.registry.remove(vec![incident.id.clone()]).await {
            tracing::warn!(
                incident_id = %incident.id,
                error = %e,
                "Failed to remove resolved incident from pending escalations"
            );
        }

        Ok(incident)
    }

    /// Ids currently awaiting escalation evaluation
    pub async fn pending_escalations(&self) -> Result<Vec<String>> {
        self.registry.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{InMemoryEventBus, INCIDENT_CREATED_TOPIC};
    use crate::state::{InMemoryStore, StateStore};
    use futures::StreamExt;

    async fn processor() -> (IncidentProcessor, Arc<InMemoryEventBus>, EscalationRegistry) {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let bus = Arc::new(InMemoryEventBus::new(16));
        let registry = EscalationRegistry::spawn(store.clone(), 16).await.unwrap();
        let processor = IncidentProcessor::new(IncidentRepository::new(store), bus.clone(), registry.clone());
        (processor, bus, registry)
    }

    #[tokio::test]
    async fn test_create_persists_and_publishes() {
        let (processor, bus, _) = processor().await;
        let mut sub = bus.subscribe(INCIDENT_CREATED_TOPIC).await.unwrap();

        let incident = processor
            .create_incident(
                "Server down".to_string(),
                Some("web-01".to_string()),
                IncidentSource::Monitoring,
            )
            .await
            .unwrap();
        assert_eq!(incident.status, IncidentStatus::Created);

        let stored = processor.get_incident(&incident.id).await.unwrap();
        assert_eq!(stored, incident);

        let event: IncidentCreated = sub.next().await.unwrap().decode().unwrap();
        assert_eq!(event.incident_id, incident.id);
        assert_eq!(event.created_at, incident.created_at);
        assert_eq!(event.source, IncidentSource::Monitoring);
    }

    #[tokio::test]
    async fn test_blank_title_is_rejected() {
        let (processor, _, _) = processor().await;
        let err = processor
            .create_incident("   ".to_string(), None, IncidentSource::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let (processor, _, _) = processor().await;
        let err = processor.get_incident("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_removes_from_pending() {
        let (processor, _, registry) = processor().await;
        let incident = processor
            .create_incident("Outage".to_string(), None, IncidentSource::User)
            .await
            .unwrap();
        registry.register(&incident.id).await.unwrap();

        let resolved = processor.resolve_incident(&incident.id).await.unwrap();
        assert_eq!(resolved.status, IncidentStatus::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert!(processor.pending_escalations().await.unwrap().is_empty());

        let err = processor.resolve_incident(&incident.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }
}
