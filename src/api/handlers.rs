use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{Incident, IncidentSource};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create an incident and start the pipeline
pub async fn create_incident(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateIncidentRequest>, JsonRejection>,
) -> Result<Json<CreateIncidentResponse>> {
    let Json(request) =
        payload.map_err(|e| AppError::Validation(format!("Invalid request body: {}", e.body_text())))?;
    request.validate()?;

    let incident = state
        .processor
        .create_incident(request.title, request.description, request.source)
        .await?;

    Ok(Json(CreateIncidentResponse {
        status: "processing".to_string(),
        incident_id: incident.id,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIncidentRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    pub source: IncidentSource,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentResponse {
    pub status: String,
    pub incident_id: String,
}

/// Get an incident by ID
pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IncidentResponse>> {
    let incident = state.processor.get_incident(&id).await?;
    Ok(Json(IncidentResponse::from(incident)))
}

/// Resolve an incident
pub async fn resolve_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IncidentResponse>> {
    let incident = state.processor.resolve_incident(&id).await?;
    Ok(Json(IncidentResponse::from(incident)))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentResponse {
    pub incident_id: String,
    pub data: Incident,
}

impl From<Incident> for IncidentResponse {
    fn from(incident: Incident) -> Self {
        Self {
            incident_id: incident.id.clone(),
            data: incident,
        }
    }
}

/// Ids awaiting escalation evaluation
pub async fn pending_escalations(State(state): State<AppState>) -> Result<Json<PendingEscalationsResponse>> {
    let incident_ids = state.processor.pending_escalations().await?;
    Ok(Json(PendingEscalationsResponse {
        total: incident_ids.len(),
        incident_ids,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEscalationsResponse {
    pub incident_ids: Vec<String>,
    pub total: usize,
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}
