//! voxdeck-daemon: bridges control-surface buttons to speech-to-text apps
//!
//! The daemon runs next to the control-surface host and provides:
//! - An IPC server consuming button lifecycle events from the host
//! - A per-button state reconciler: optimistic toggles with a grace
//!   window, plus periodic best-effort polling of the target app
//! - An adapter registry for the supported speech-to-text applications
//! - Rendered state icons pushed back to the host as data URIs

mod adapters;
mod config;
mod events;
mod ipc;
mod lifecycle;
mod render;
mod settings;
mod state;
mod system;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::default_registry;
use crate::config::Config;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::state::Reconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voxdeck-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, "configuration loaded");

    // Adapter registry: populated once, read-only afterwards
    let registry = Arc::new(default_registry());
    info!(adapters = registry.list().len(), "adapter registry ready");

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Channels for inter-component communication
    // Host surface -> reconciler
    let (event_tx, event_rx) = mpsc::channel(64);
    // Reconciler -> display fan-out
    let (display_tx, mut display_rx) = mpsc::channel(64);
    // Fan-out -> subscribed IPC clients
    let (image_tx, _image_rx) = broadcast::channel(64);

    // Create the reconciler
    let reconciler = Reconciler::new(Arc::clone(&registry), display_tx);

    // Create the IPC server
    let server = Server::new(
        &config.socket_path,
        event_tx,
        image_tx.clone(),
        Arc::clone(&registry),
    )?;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the reconciler (processes host-surface events)
        _ = reconciler.run(event_rx) => {
            info!("reconciler exited");
        }

        // Run the IPC server (accepts host connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Fan rendered icons out to subscribed clients
        _ = async {
            while let Some(update) = display_rx.recv().await {
                // no subscribers is fine; the next state change re-renders
                let _ = image_tx.send(update);
            }
        } => {
            info!("display fan-out exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;

    info!("voxdeck-daemon stopped");

    Ok(())
}
