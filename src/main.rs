use incident_flow::{
    api::{build_router, AppState},
    config::Config,
    escalation::{EscalationRegistry, EscalationSweeper},
    messaging::create_event_bus,
    processing::{IncidentAssigner, IncidentClassifier, IncidentPipeline, IncidentProcessor},
    scheduler::SchedulerService,
    state::{create_store, IncidentRepository},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("incident_flow={},tower_http=info", config.observability.log_level).into());
    let subscriber = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Failed to load configuration, using defaults");
    }

    tracing::info!(
        service = %config.observability.service_name,
        "Starting incident flow v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        incident_flow::metrics::init_metrics();
        tracing::info!("Prometheus metrics initialized");
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Initialize storage backend
    tracing::info!("Storage backend: {:?}", config.state.backend);
    let store = create_store(&config.state).await?;
    let incidents = IncidentRepository::new(store.clone());

    // Initialize event bus
    tracing::info!("Messaging backend: {:?}", config.messaging.backend);
    let bus = create_event_bus(&config.messaging).await?;

    // Pending escalation set
    let registry = EscalationRegistry::spawn(store.clone(), config.escalation.registry_buffer).await?;

    // Wire the classifier and assigner to their topics
    let classifier = Arc::new(IncidentClassifier::new(incidents.clone(), bus.clone()));
    let assigner = Arc::new(IncidentAssigner::new(incidents.clone(), registry.clone()));
    let pipeline = IncidentPipeline::start(bus.clone(), classifier, assigner).await?;

    // Schedule the escalation sweep
    let sweeper = Arc::new(EscalationSweeper::new(
        incidents.clone(),
        registry.clone(),
        config.escalation.threshold()?,
    ));
    let mut scheduler = SchedulerService::new().await?;
    scheduler
        .add_job(sweeper.into_job(&config.escalation.sweep_schedule))
        .await?;
    scheduler.start().await?;
    tracing::info!(
        schedule = %config.escalation.sweep_schedule,
        threshold_secs = config.escalation.threshold_secs,
        "Escalation sweep scheduled"
    );

    let processor = Arc::new(IncidentProcessor::new(incidents, bus, registry));
    let app = build_router(AppState::new(processor)).layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   REST API: http://{}/v1/incidents", http_addr);

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    pipeline.shutdown();
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }
    Ok(())
}
