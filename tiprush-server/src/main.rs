//! Tiprush Server
//!
//! A donation-driven game session server: viewer donations pass through
//! layered admission control, apply their effects to a shared session
//! state, and fan out to play clients and overlays in real time.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tiprush_core::admission::{AdmissionGate, CooldownTracker, RateLimiter};
use tiprush_core::events::{hub_command_channel, pipeline_command_channel};
use tiprush_core::hub::{BroadcastHub, HubHandle};
use tiprush_core::pipeline::{DonationPipeline, PipelineHandle};
use tiprush_core::queue::EventQueue;
use tiprush_core::session::SessionMachine;

/// Tiprush - donation-driven game session server
#[derive(Parser, Debug)]
#[command(name = "tiprush-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./tiprush-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting tiprush-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. Validation failures are fatal; nothing past
    // this point is.
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Composition root: every pipeline component is constructed once,
    // here, and handed to whatever needs it. No ambient lookups.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (hub_tx, hub_rx) = hub_command_channel();
    let hub_handle = HubHandle::new(hub_tx);
    let hub = BroadcastHub::new(loaded.hub);
    let hub_task = tokio::spawn(hub.run(shutdown_rx.clone(), hub_rx));

    let now = Instant::now();
    let gate = AdmissionGate::new(
        RateLimiter::new(loaded.rate, now),
        CooldownTracker::new(loaded.cooldowns),
    );
    let machine = SessionMachine::new(loaded.pipeline.spawn_backlog_cap, hub_handle.clone());

    let (pipeline_tx, pipeline_rx) = pipeline_command_channel();
    let pipeline_handle = PipelineHandle::new(pipeline_tx);
    let pipeline = DonationPipeline::new(
        gate,
        EventQueue::new(),
        machine,
        hub_handle.clone(),
        loaded.pipeline,
    );
    let pipeline_task = tokio::spawn(pipeline.run(shutdown_rx, pipeline_rx));

    // Create application state
    let state = AppState::new(pipeline_handle.clone(), hub_handle, loaded.admin_secret);

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(pipeline_handle, config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the background tasks
    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    let _ = hub_task.await;
    let _ = pipeline_task.await;

    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
