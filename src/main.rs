// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use explore_query::QueryOrchestrator;
use explore_query::application::clock::SystemClock;
use explore_query::infrastructure::config::load_explore_config;
use explore_query::infrastructure::http_datasource::HttpDatasourceGateway;
use explore_query::presentation::app_state::AppState;
use explore_query::presentation::handlers::{
    get_snapshot, health_check, metadata, set_query_text, stream_events, submit,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_explore_config()?;

    // Create datasource gateway (infrastructure layer)
    let gateway = Arc::new(HttpDatasourceGateway::new(
        config.datasource.url,
        config.datasource.token,
        Duration::from_millis(config.datasource.timeout_ms),
    )?);

    // Create orchestrator (application layer)
    let orchestrator = QueryOrchestrator::new(
        gateway,
        Arc::new(SystemClock),
        config.query.orchestrator_options(),
    );

    // Connect once at startup; failures stay visible in the snapshot
    let startup = orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = startup.initialize_datasource().await {
            tracing::warn!("Starting without a datasource: {}", e);
        }
    });

    let state = Arc::new(AppState { orchestrator });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/explore", get(get_snapshot))
        .route("/explore/query", put(set_query_text))
        .route("/explore/submit", post(submit))
        .route("/explore/metadata", get(metadata))
        .route("/explore/events", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting explore-query service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
