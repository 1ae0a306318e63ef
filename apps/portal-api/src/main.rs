mod backend_client;
mod config;
mod errors;
mod filtering;
mod models;
mod results;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend_client::HttpTransport;
use crate::config::Config;
use crate::filtering::orchestrator::FilteringOrchestrator;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Portal API v{}", env!("CARGO_PKG_VERSION"));

    // Backend client
    let transport = HttpTransport::new(
        &config.backend_url,
        config.backend_api_key.clone(),
        config.timeouts(),
    )?;
    info!("Backend client initialized ({})", config.backend_url);

    let settings = config.orchestrator_settings();
    info!(
        "Filtering poll interval {:?}, auto-refresh {:?}",
        settings.poll_interval, settings.auto_refresh
    );
    let orchestrator = Arc::new(FilteringOrchestrator::new(Arc::new(transport), settings));

    let state = AppState {
        orchestrator: orchestrator.clone(),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the portal frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
