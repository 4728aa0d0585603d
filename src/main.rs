//! progress-relay server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use progress_relay::app_state::AppState;
use progress_relay::config::RelayConfig;
use progress_relay::server::{build_app, shutdown_signal};
use progress_relay::service::ProgressHub;
use progress_relay::storage::StorageClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; LOG_FORMAT=json switches to structured output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = RelayConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        cleanup_delay_secs = config.cleanup_delay_secs,
        cleanup_policy = %config.cleanup_policy,
        "starting progress-relay"
    );

    // Build the broadcast core
    let hub = ProgressHub::new(config.hub_settings());

    // Storage collaborator is optional; its endpoints answer 503 without it
    let storage = config.storage.clone().map(|cfg| Arc::new(StorageClient::new(cfg)));
    if storage.is_none() {
        tracing::warn!("object storage not configured; upload endpoints will return 503");
    }

    // Build application state
    let app_state = AppState {
        hub: hub.clone(),
        storage,
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = build_app(app_state, Duration::from_secs(config.request_timeout_secs));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
