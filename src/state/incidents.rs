use crate::error::Result;
use crate::models::Incident;
use crate::state::{StateStore, INCIDENTS_NAMESPACE};
use std::sync::Arc;

/// Typed access to incident records.
///
/// Every update is read-entire-record, merge, write-entire-record. Two
/// writers racing on the same id resolve as last-write-wins; there is no
/// version check.
#[derive(Clone)]
pub struct IncidentRepository {
    store: Arc<dyn StateStore>,
}

impl IncidentRepository {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Load the full record for an id
    pub async fn load(&self, id: &str) -> Result<Option<Incident>> {
        match self.store.get(INCIDENTS_NAMESPACE, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Write the full record back under its id
    pub async fn save(&self, incident: &Incident) -> Result<()> {
        let value = serde_json::to_value(incident)?;
        self.store.set(INCIDENTS_NAMESPACE, &incident.id, value).await?;

        tracing::debug!(
            incident_id = %incident.id,
            status = %incident.status,
            timeline_len = incident.timeline.len(),
            "Incident saved"
        );
        Ok(())
    }
}
