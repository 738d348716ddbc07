//! Startup helpers for the community agent server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::server::{self, AppState};

/// Run the server until Ctrl+C (used by the `community-agent-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();

    tracing::info!("Starting community agent v{}", env!("CARGO_PKG_VERSION"));

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(&config)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Initialize the global tracing subscriber (`RUST_LOG`, default `info`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if state creation fails.
pub fn initialize(config: &AgentConfig) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    AppState::new(config).map_err(|e| format!("Failed to create state: {e}").into())
}

/// Build state, start the memory sweep, serve, and stop the sweep on shutdown.
///
/// # Errors
/// Returns an error if state creation or the server fails.
pub async fn serve(config: &AgentConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = initialize(config)?;
    state.memory.start(&state.shutdown).await;

    let result = server::run_server_with_shutdown(Arc::clone(&state), config.port, shutdown_signal()).await;

    state.shutdown.cancel();
    state.memory.stop().await;
    tracing::info!("Community agent stopped");
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
