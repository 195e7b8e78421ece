use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use incident_flow::{
    api::{
        build_router,
        handlers::{CreateIncidentResponse, IncidentResponse, PendingEscalationsResponse},
        AppState,
    },
    escalation::EscalationRegistry,
    messaging::{EventBus, InMemoryEventBus},
    models::{IncidentStatus, TimelineEntry},
    processing::{IncidentAssigner, IncidentClassifier, IncidentPipeline, IncidentProcessor},
    state::{IncidentRepository, InMemoryStore, StateStore},
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> (Router, IncidentPipeline) {
    let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new(64));
    let incidents = IncidentRepository::new(store.clone());
    let registry = EscalationRegistry::spawn(store, 16).await.unwrap();

    let pipeline = IncidentPipeline::start(
        bus.clone(),
        Arc::new(IncidentClassifier::new(incidents.clone(), bus.clone())),
        Arc::new(IncidentAssigner::new(incidents.clone(), registry.clone())),
    )
    .await
    .unwrap();

    let processor = Arc::new(IncidentProcessor::new(incidents, bus, registry));
    (build_router(AppState::new(processor)), pipeline)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn decode<T: DeserializeOwned>(body: Value) -> T {
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_create_returns_processing() {
    let (app, pipeline) = app().await;

    let (status, body) = send(
        &app,
        post_json("/v1/incidents", json!({"title": "Server CPU down", "source": "user"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let created: CreateIncidentResponse = decode(body);
    assert_eq!(created.status, "processing");
    assert!(!created.incident_id.is_empty());

    pipeline.shutdown();
}

#[tokio::test]
async fn test_invalid_source_is_rejected() {
    let (app, pipeline) = app().await;

    let (status, body) = send(
        &app,
        post_json("/v1/incidents", json!({"title": "Server down", "source": "pager"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    pipeline.shutdown();
}

#[tokio::test]
async fn test_missing_and_empty_title_are_rejected() {
    let (app, pipeline) = app().await;

    let (status, _) = send(&app, post_json("/v1/incidents", json!({"source": "user"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json("/v1/incidents", json!({"title": "", "source": "user"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Request::post("/v1/incidents")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    pipeline.shutdown();
}

#[tokio::test]
async fn test_get_unknown_incident_is_404() {
    let (app, pipeline) = app().await;

    let (status, body) = send(
        &app,
        Request::get("/v1/incidents/does-not-exist").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    pipeline.shutdown();
}

#[tokio::test]
async fn test_created_incident_is_readable_and_progresses() {
    let (app, pipeline) = app().await;

    let (_, body) = send(
        &app,
        post_json(
            "/v1/incidents",
            json!({"title": "API latency", "description": "p99 at 4s", "source": "monitoring"}),
        ),
    )
    .await;
    let created: CreateIncidentResponse = decode(body);
    let uri = format!("/v1/incidents/{}", created.incident_id);

    let mut incident = None;
    for _ in 0..200 {
        let (status, body) = send(&app, Request::get(uri.as_str()).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);

        let response: IncidentResponse = decode(body);
        assert_eq!(response.incident_id, created.incident_id);
        if response.data.status == IncidentStatus::Assigned {
            incident = Some(response.data);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let incident = incident.expect("incident was never assigned");
    assert!(matches!(incident.timeline[0], TimelineEntry::Created { .. }));
    assert_eq!(incident.timeline.len(), 3);

    pipeline.shutdown();
}

#[tokio::test]
async fn test_resolve_and_pending_endpoints() {
    let (app, pipeline) = app().await;

    let (_, body) = send(
        &app,
        post_json("/v1/incidents", json!({"title": "Regional outage", "source": "webhook"})),
    )
    .await;
    let created: CreateIncidentResponse = decode(body);

    let (status, body) = send(
        &app,
        Request::get("/v1/escalations/pending").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let pending: PendingEscalationsResponse = decode(body);
    assert_eq!(pending.total, pending.incident_ids.len());

    let resolve_uri = format!("/v1/incidents/{}/resolve", created.incident_id);
    let (status, body) = send(&app, Request::post(resolve_uri.as_str()).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let resolved: IncidentResponse = decode(body);
    assert_eq!(resolved.data.status, IncidentStatus::Resolved);

    let (status, body) = send(&app, Request::post(resolve_uri.as_str()).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE_TRANSITION");

    let (status, _) = send(
        &app,
        Request::post("/v1/incidents/ghost/resolve").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    pipeline.shutdown();
}
