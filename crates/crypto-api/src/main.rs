//! `crypto-api` — HTTP service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from `.env` and environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP export).
//! 3. Build the cipher engine around the server secret.
//! 4. Build the Axum router and start the HTTP server.

mod config;
mod crypto;
mod server;
mod telemetry;

use anyhow::{Context, Result};
use tracing::info;

use config::Config;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %cfg.host,
        port = cfg.port,
        "crypto-api starting"
    );

    // -----------------------------------------------------------------------
    // 3. Cipher engine
    // -----------------------------------------------------------------------
    let cors_origins = cfg.cors_origins();
    let state = AppState::new(cfg.encryption_key);

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let cors = server::router::cors_layer(&cors_origins)?;
    let router = server::router::build(state, cors);

    let listener = tokio::net::TcpListener::bind((cfg.host.as_str(), cfg.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cfg.host, cfg.port))?;
    info!(
        addr = %listener.local_addr()?,
        cors_origins = ?cors_origins,
        "listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("crypto-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
