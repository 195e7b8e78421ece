use chrono::Utc;
use incident_flow::{
    config::{StateBackend, StateConfig},
    escalation::EscalationRegistry,
    models::{AssignedTeam, Category, Incident, IncidentSource, Priority},
    state::{
        create_store, IncidentRepository, InMemoryStore, SledStore, StateStore,
        ESCALATION_NAMESPACE, PENDING_IDS_KEY,
    },
    AppError,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

/// Test suite that runs against any StateStore implementation
async fn test_store_operations(store: Arc<dyn StateStore>) {
    // Absent keys
    assert!(store.get("incidents", "nope").await.unwrap().is_none());

    // Whole-value replace
    store.set("ns", "k", json!({"a": 1, "b": 2})).await.unwrap();
    store.set("ns", "k", json!({"a": 3})).await.unwrap();
    assert_eq!(store.get("ns", "k").await.unwrap(), Some(json!({"a": 3})));

    // Namespaces are isolated
    store.set("other", "k", json!("x")).await.unwrap();
    assert_eq!(store.get("ns", "k").await.unwrap(), Some(json!({"a": 3})));
    assert_eq!(store.get("other", "k").await.unwrap(), Some(json!("x")));
}

async fn test_incident_round_trip(store: Arc<dyn StateStore>) {
    let repo = IncidentRepository::new(store);
    let mut incident = Incident::new(
        "Disk full on db-02".to_string(),
        Some("90% used".to_string()),
        IncidentSource::Monitoring,
    );
    let at = Utc::now();
    incident.classify_at(Priority::Low, Category::Infra, at).unwrap();
    incident.assign_at(AssignedTeam::InfraOps, at).unwrap();

    repo.save(&incident).await.unwrap();
    let loaded = repo.load(&incident.id).await.unwrap().unwrap();
    assert_eq!(loaded, incident);
}

async fn test_registry_persistence(store: Arc<dyn StateStore>) {
    let registry = EscalationRegistry::spawn(store.clone(), 8).await.unwrap();
    registry.register("a").await.unwrap();
    registry.register("b").await.unwrap();
    registry.remove(vec!["a".to_string()]).await.unwrap();

    let persisted = store.get(ESCALATION_NAMESPACE, PENDING_IDS_KEY).await.unwrap();
    assert_eq!(persisted, Some(json!(["b"])));
}

#[tokio::test]
async fn test_in_memory_store() {
    let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
    test_store_operations(store.clone()).await;
    test_incident_round_trip(store.clone()).await;
    test_registry_persistence(store).await;
}

#[tokio::test]
async fn test_sled_store() {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn StateStore> = Arc::new(SledStore::new(temp_dir.path()).unwrap());
    test_store_operations(store.clone()).await;
    test_incident_round_trip(store.clone()).await;
    test_registry_persistence(store).await;
}

#[tokio::test]
async fn test_factory_builds_sled_store() {
    let temp_dir = TempDir::new().unwrap();
    let config = StateConfig {
        backend: StateBackend::Sled,
        path: Some(temp_dir.path().join("state")),
        ..Default::default()
    };

    let store = create_store(&config).await.unwrap();
    test_store_operations(store).await;
}

#[tokio::test]
async fn test_factory_rejects_incomplete_config() {
    let sled = StateConfig {
        backend: StateBackend::Sled,
        path: None,
        ..Default::default()
    };
    assert!(matches!(create_store(&sled).await, Err(AppError::Configuration(_))));

    let redis = StateConfig {
        backend: StateBackend::Redis,
        redis_url: None,
        ..Default::default()
    };
    assert!(matches!(create_store(&redis).await, Err(AppError::Configuration(_))));
}
