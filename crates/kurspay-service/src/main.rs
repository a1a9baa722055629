//! Kurspay Service - HTTP API for course payment confirmation
//!
//! This is the main entry point for the kurspay service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kurspay_service::{create_router, sweeper, AppState, ServiceConfig};
use kurspay_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kurspay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Kurspay Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        mailer_configured = %config.mailer_api_url.is_some(),
        bootstrap_admins = config.bootstrap_admins.len(),
        sweep_interval_hours = config.sweep_interval_hours,
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    // Build app state
    let state = Arc::new(AppState::new(store, config.clone()));

    // Start the background expiry sweeper
    sweeper::spawn(Arc::clone(&state));
    tracing::info!("Expiry sweeper scheduled");

    // Create the router
    let app = create_router(state.as_ref().clone());
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
