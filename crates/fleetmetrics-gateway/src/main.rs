//! fleetmetrics gateway
//!
//! - Business routes: /cars, /cars/{id}, /boats
//! - Per-route request metrics (count, latency, in-flight)
//! - /metrics scrape, /healthz, /readyz
//! - Graceful shutdown on Ctrl-C / SIGTERM

use std::sync::Arc;

use fleetmetrics_core::error::{FleetError, Result};
use fleetmetrics_core::metrics::Registry;
use tracing_subscriber::{fmt, EnvFilter};

use fleetmetrics_gateway::{app_state::AppState, config, router};

const DEFAULT_CONFIG_PATH: &str = "fleetmetrics.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_or_default(&path)?;
    let listen = cfg.server.listen_addr()?;

    // Instrumentation is part of the router, so it is live before the first
    // connection is accepted.
    let registry = Arc::new(Registry::new());
    let state = AppState::new(cfg, registry)?;
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| FleetError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, "fleetmetrics-gateway starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| FleetError::Internal(format!("server failed: {e}")))?;

    tracing::info!("fleetmetrics-gateway stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    state.set_draining();
    tracing::info!("shutdown signal received, draining");
}
