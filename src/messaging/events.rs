//! Event types for the incident pipeline

use crate::messaging::error::{MessagingError, MessagingResult};
use crate::models::{IncidentSource, Priority};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Topic carrying newly created incidents
pub const INCIDENT_CREATED_TOPIC: &str = "incident-created";

/// Topic carrying classified incidents
pub const INCIDENT_CLASSIFIED_TOPIC: &str = "incident-classified";

/// A typed payload published on a fixed topic
pub trait IncidentEvent: Serialize + DeserializeOwned + Send + Sync {
    const TOPIC: &'static str;

    fn incident_id(&self) -> &str;
}

/// Published by the inbound boundary once the CREATED record is persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentCreated {
    pub incident_id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: IncidentSource,
}

impl IncidentEvent for IncidentCreated {
    const TOPIC: &'static str = INCIDENT_CREATED_TOPIC;

    fn incident_id(&self) -> &str {
        &self.incident_id
    }
}

/// Published by the classifier. Category is not carried; the assigner reads
/// it from the persisted record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentClassified {
    pub incident_id: String,
    pub priority: Priority,
}

impl IncidentEvent for IncidentClassified {
    const TOPIC: &'static str = INCIDENT_CLASSIFIED_TOPIC;

    fn incident_id(&self) -> &str {
        &self.incident_id
    }
}

/// Message metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Message ID
    pub message_id: String,

    /// Publish timestamp
    pub timestamp: DateTime<Utc>,

    /// Publishing service
    pub source: String,
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            source: "incident-flow".to_string(),
        }
    }
}

/// Message envelope wrapping a JSON payload with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Message metadata
    pub metadata: MessageMetadata,

    /// Topic the message was published on
    pub topic: String,

    /// Message payload
    pub payload: Value,
}

impl MessageEnvelope {
    /// Create a new message envelope
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            metadata: MessageMetadata::default(),
            topic: topic.into(),
            payload,
        }
    }

    /// Wrap a typed event
    pub fn from_event<E: IncidentEvent>(event: &E) -> MessagingResult<Self> {
        Ok(Self::new(E::TOPIC, serde_json::to_value(event)?))
    }

    /// Decode the payload into a typed event
    pub fn decode<E: IncidentEvent>(&self) -> MessagingResult<E> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            MessagingError::DeserializationError(format!(
                "invalid {} payload: {}",
                self.topic, e
            ))
        })
    }
}
