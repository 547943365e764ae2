//! tenantforge HTTP service
//!
//! Wires the Vault client and terraform engine into an axum router and
//! serves it until SIGINT or SIGTERM.

pub mod cli;
pub mod error;
pub mod http;
pub mod state;

pub use state::AppState;

use anyhow::Context;
use std::sync::Arc;
use tenantforge_apply::TerraformEngine;
use tenantforge_core::ServerConfig;
use tenantforge_secrets::VaultClient;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Build the shared state from configuration. Fails if terraform is not
/// usable, before anything binds.
pub fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let backend = VaultClient::new(&config.vault).context("failed to build Vault client")?;
    let engine = TerraformEngine::new(&config.terraform).context("terraform is not usable")?;
    info!(
        working_dir = %engine.working_dir().display(),
        propagation_window = ?config.propagation_window,
        "Apply engine ready"
    );

    Ok(AppState::new(
        Arc::new(backend),
        Arc::new(engine),
        config.propagation_window,
    ))
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let state = build_state(&config)?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind http listener on {addr}"))?;
    info!(addr = %listener.local_addr()?, vault = %config.vault.address, "http server listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    info!("http server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(?err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(?err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
