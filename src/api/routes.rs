use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Incident lifecycle
        .route("/v1/incidents", post(handlers::create_incident))
        .route("/v1/incidents/:id", get(handlers::get_incident))
        .route("/v1/incidents/:id/resolve", post(handlers::resolve_incident))
        .route("/v1/escalations/pending", get(handlers::pending_escalations))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::EscalationRegistry;
    use crate::messaging::InMemoryEventBus;
    use crate::processing::IncidentProcessor;
    use crate::state::{IncidentRepository, InMemoryStore, StateStore};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn router() -> Router {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let registry = EscalationRegistry::spawn(store.clone(), 16).await.unwrap();
        let processor = IncidentProcessor::new(
            IncidentRepository::new(store),
            Arc::new(InMemoryEventBus::default()),
            registry,
        );
        build_router(AppState::new(Arc::new(processor)))
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        crate::metrics::init_metrics();
        let response = router()
            .await
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("incident_flow_"));
    }
}
