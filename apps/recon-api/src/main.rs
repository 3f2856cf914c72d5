//! # Étal Reconciliation API
//!
//! Serves reconciliation reports and exports over HTTP.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use etal_recon::{ReconConfig, ReconciliationService};
use etal_recon_api::{router, AppState, ServerConfig};
use etal_source::HttpStockSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,etal=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting reconciliation API...");

    // Load configuration
    let server = ServerConfig::load()?;
    let config = ReconConfig::load(server.config_path.clone())?;
    info!(
        data_api = %config.api.base_url,
        max_period_days = config.fetch.max_period_days,
        "Configuration loaded"
    );

    let source = Arc::new(HttpStockSource::new(&config.api)?);
    let service = ReconciliationService::new(source, &config);
    let app = router(AppState::new(service, server.request_timeout()));

    let bind_addr = server.bind_address();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!(addr = %bind_addr, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
