//! Region host binary for Gridlink.
//!
//! Hosts the regions listed in configuration behind the hand-off ingress,
//! each backed by a [`MemoryScene`].
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `gridlink.yaml` (or `GRIDLINK_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the transport, worker pool, grid directory and registry
//! 4. Register every configured region and announce it to its neighbors
//! 5. Serve the ingress until `Ctrl-C`
//! 6. Take every region down, then wait for background work to drain
//!
//! # Event Queues
//!
//! The binary has no viewer login path, so nothing here learns an agent's
//! event queue URL. Its [`AgentCapsTable`] starts empty and the event queue
//! only discards buffers when an agent is closed. A host that terminates
//! viewer sessions fills the table through
//! [`AgentCapsTable::add_event_queue_url`] and
//! [`AgentCapsTable::add_region`] before events can be delivered.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use gridlink_core::config::LoggingConfig;
use gridlink_core::{
    Dispatcher, GridDirectory, GridlinkConfig, HttpGridDirectory, HttpTransport,
    InMemoryGridDirectory, NeighborDirectory, RegionRegistry, SceneHost, Transport,
};
use gridlink_events::{AgentCapsTable, CapsRegistry, EventQueueClient};
use gridlink_server::{AppState, MemoryScene, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config = %config_path.display(),
        host = %config.server.host,
        port = config.server.port,
        regions = config.grid.regions.len(),
        "gridlink-server starting"
    );

    // 3. Build components.
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.handoff.request_timeout()));
    let dispatcher = Dispatcher::new(config.dispatch.workers);
    let grid: Arc<dyn GridDirectory> = match &config.grid.directory_url {
        Some(url) => {
            info!(url = %url, "using remote grid directory");
            Arc::new(HttpGridDirectory::new(url.clone(), Arc::clone(&transport)))
        }
        None => {
            info!("using in-memory grid directory");
            Arc::new(InMemoryGridDirectory::with_regions(config.grid.regions.clone()))
        }
    };
    let registry = Arc::new(RegionRegistry::new());
    let neighbors = Arc::new(NeighborDirectory::new(
        config.neighbors.clone(),
        grid,
        Arc::clone(&registry),
        dispatcher.clone(),
    ));
    let caps = Arc::new(AgentCapsTable::new());
    let events = EventQueueClient::new(
        Arc::clone(&transport),
        caps as Arc<dyn CapsRegistry>,
        dispatcher.clone(),
        config.events.max_pending_per_region,
    );

    // 4. Bring regions up.
    for region in &config.grid.regions {
        let scene = Arc::new(MemoryScene::new(region.clone(), config.server.port));
        registry.register(region.clone(), scene as Arc<dyn SceneHost>).await;
        let informed = neighbors.region_came_up(region).await;
        info!(
            region = %region.name,
            handle = %region.handle(),
            informed = informed.len(),
            "region up"
        );
    }

    // 5. Serve until Ctrl-C.
    let state = Arc::new(AppState::new(
        Arc::clone(&registry),
        Arc::clone(&neighbors),
        events,
    ));
    start_server(&config.server, state, shutdown_signal())
        .await
        .context("ingress server failed")?;

    // 6. Take regions down and drain.
    for region in &config.grid.regions {
        registry.unregister(region.region_id).await;
        neighbors.region_went_down(region).await;
    }
    dispatcher.wait_idle().await;
    info!("gridlink-server stopped");
    Ok(())
}

/// Read `GRIDLINK_CONFIG` (default `gridlink.yaml`). A missing file means
/// defaults plus environment overrides.
fn load_config() -> anyhow::Result<(GridlinkConfig, PathBuf)> {
    let path = std::env::var("GRIDLINK_CONFIG")
        .map_or_else(|_| PathBuf::from("gridlink.yaml"), PathBuf::from);
    let config = if path.exists() {
        GridlinkConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        GridlinkConfig::parse("").context("building default configuration")?
    };
    Ok((config, path))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
    }
    info!("shutdown requested");
}
