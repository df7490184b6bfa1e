// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # spawnerd
//!
//! Daemon wiring for the spawner-drone orchestration core:
//!
//! 1. open the state store and the Docker runtime
//! 2. reconcile the fleet view from the store
//! 3. start the orchestrator loop and the event pumps
//! 4. serve the WebSocket control channel until SIGINT

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use spawner_drone_core::application::{Orchestrator, OrchestratorHandle};
use spawner_drone_core::domain::bus::MessageBus;
use spawner_drone_core::domain::message::{DroneStatusEvent, STATUS_SUBJECT};
use spawner_drone_core::domain::runtime::ContainerRuntime;
use spawner_drone_core::domain::store::StateStore;
use spawner_drone_core::infrastructure::{
    BroadcastBus, DockerRuntime, FleetEvents, MemoryStateStore, SqliteStateStore,
};
use spawner_drone_core::presentation::{router, ControlState};

mod config;

use config::{NodeConfig, StoreBackend};

/// Spawner drone fleet orchestrator daemon
#[derive(Parser)]
#[command(name = "spawnerd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SPAWNER_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Control channel listen address (overrides config)
    #[arg(long, env = "SPAWNER_LISTEN")]
    listen: Option<SocketAddr>,

    /// Docker daemon socket path (overrides config)
    #[arg(long, env = "SPAWNER_DOCKER_SOCKET")]
    docker_socket: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SPAWNER_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = NodeConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(socket) = cli.docker_socket {
        config.docker.socket = Some(socket);
    }

    run(config).await
}

async fn run(config: NodeConfig) -> Result<()> {
    let store: Arc<dyn StateStore> = match config.store.backend {
        StoreBackend::Sqlite => {
            info!(path = %config.store.path.display(), "opening sqlite state store");
            Arc::new(
                SqliteStateStore::open(&config.store.path)
                    .await
                    .context("failed to open state store")?,
            )
        }
        StoreBackend::Memory => {
            warn!("using the in-memory store; fleet state will not survive a restart");
            Arc::new(MemoryStateStore::new())
        }
    };

    let runtime = Arc::new(
        DockerRuntime::new(config.docker.socket.as_deref())
            .context("failed to create Docker runtime")?,
    );
    runtime
        .healthcheck()
        .await
        .context("Docker daemon not reachable")?;

    let bus = Arc::new(BroadcastBus::default());
    let events = FleetEvents::default();

    let (mut orchestrator, handle) = Orchestrator::new(
        store,
        runtime.clone(),
        bus.clone(),
        events.clone(),
        config.fleet_config()?,
    );
    orchestrator
        .reconcile()
        .await
        .context("failed to reconcile fleet state")?;
    tokio::spawn(orchestrator.run());

    spawn_status_pump(bus, handle.clone());
    spawn_container_pump(runtime, handle.clone()).await?;

    let app = router(ControlState {
        handle: handle.clone(),
        events,
    });
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(listen = %config.listen, "control channel listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handle))
        .await
        .context("control channel server failed")?;
    Ok(())
}

/// Forward drone status events from the bus into the orchestrator queue.
fn spawn_status_pump(bus: Arc<BroadcastBus>, handle: OrchestratorHandle) {
    tokio::spawn(async move {
        let mut subscription = match bus.subscribe(STATUS_SUBJECT).await {
            Ok(subscription) => subscription,
            Err(err) => {
                error!(%err, "failed to subscribe to drone status subject");
                return;
            }
        };
        while let Some(message) = subscription.next().await {
            match serde_json::from_slice::<DroneStatusEvent>(&message.payload) {
                Ok(event) => {
                    if handle.drone_event(event).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!(%err, "dropping undecodable status event"),
            }
        }
    });
}

/// Forward container lifecycle events from the Docker watch into the queue.
async fn spawn_container_pump(
    runtime: Arc<DockerRuntime>,
    handle: OrchestratorHandle,
) -> Result<()> {
    let mut watch = runtime
        .watch()
        .await
        .context("failed to watch container events")?;
    tokio::spawn(async move {
        while let Some(event) = watch.next().await {
            if handle.container_event(event).await.is_err() {
                break;
            }
        }
        warn!("container event stream ended");
    });
    Ok(())
}

async fn shutdown_signal(handle: OrchestratorHandle) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, draining orchestrator");
    handle.shutdown().await;
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
