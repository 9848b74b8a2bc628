//! GlobalTags Server - Main Entry Point

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use gt_server::clock::SystemClock;
use gt_server::config::Config;
use gt_server::notify::TracingNotifier;
use gt_server::observability;
use gt_server::roles::RoleRefreshJob;
use gt_server::state::{AppState, Stores};
use gt_server::store::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_tracing()?;

    let config = Config::from_env()?;
    let refresh_period = config.role_cache_refresh();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting GlobalTags core");

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        Stores::memory(&store),
        Arc::new(TracingNotifier),
        Arc::new(SystemClock),
        config,
    );

    // The first refresh seeds the administrator role into an empty store
    state.roles.refresh().await?;
    info!(roles = state.roles.snapshot().len(), "Role cache loaded");

    let refresh = RoleRefreshJob::new(Arc::clone(&state.roles), refresh_period).spawn();
    info!(period_secs = refresh_period.as_secs(), "Role refresh job started");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Received shutdown signal, cleaning up...");

    refresh.abort();
    info!("Shutdown complete");
    Ok(())
}
