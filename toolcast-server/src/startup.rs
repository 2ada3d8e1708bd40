//! Server startup and lifecycle

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use toolcast_core::error::ConfigResult;
use toolcast_mcp::McpState;

use crate::app::build_router;
use crate::state::AppState;

/// Load configuration, bind, and serve until shutdown.
pub async fn serve(addr: SocketAddr, config_path: PathBuf) -> anyhow::Result<()> {
    let registry = toolcast_config::load_file(&config_path).await?;
    let state = AppState::new(registry);

    let _expiry = state
        .mcp_server()
        .sessions()
        .start_expiry_task(Duration::from_secs(60));

    spawn_reload_task(state.clone(), config_path);

    let router = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "toolcast listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let registry = state.registry().current().await;
    registry.close().await;
    info!("shutdown complete");
    Ok(())
}

/// Reload the manifest and swap the registry.
///
/// A fresh registry is built first; the swap happens only after every
/// source initialized, so a broken edit never takes down the live one.
pub async fn reload(state: &AppState, config_path: &Path) -> ConfigResult<()> {
    let next = toolcast_config::load_file(config_path).await?;
    state.registry().swap(next).await;
    Ok(())
}

#[cfg(unix)]
fn spawn_reload_task(state: AppState, config_path: PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(signal) => signal,
            Err(e) => {
                error!(error = %e, "SIGHUP handler unavailable; reload disabled");
                return;
            }
        };
        loop {
            hangup.recv().await;
            info!("SIGHUP received, reloading configuration");
            if let Err(e) = reload(&state, &config_path).await {
                error!(error = %e, "reload failed; keeping current registry");
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_task(_state: AppState, _config_path: PathBuf) {}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
