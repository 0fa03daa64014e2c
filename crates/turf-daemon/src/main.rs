//! turf-daemon: the territory-conquest game daemon.
//!
//! Single OS process running a Tokio async runtime. Game servers talk to
//! the daemon via JSON-RPC over Unix socket; expiry and resolution run as
//! durable delayed triggers plus a periodic safety-net sweep.

mod commands;
mod config;
mod events;
mod roster;
mod rpc;

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::roster::DbRoster;
use crate::rpc::RpcServer;
use turf_scheduler::runtime::{run_sweep_loop, Scheduler, SchedulerHandle};

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Membership mirror (external guild service stand-in).
    pub roster: Arc<DbRoster>,
    /// Wakes the trigger scheduler after arming operations.
    pub scheduler: SchedulerHandle,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("turf=info".parse()?),
        )
        .init();

    info!("Turf daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database (runs migrations)
    let db_path = data_dir.join("turf.db");
    let conn = turf_db::open(&db_path)?;
    let db = Arc::new(Mutex::new(conn));

    // 3. Membership mirror on its own connection
    let roster = Arc::new(DbRoster::open(&db_path)?);

    // 4. Event bus + shutdown channel
    let event_bus = EventBus::new(1000);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 5. Trigger scheduler: pending triggers reload straight from the
    //    database, so nothing armed before a restart is lost.
    let (scheduler, scheduler_handle) = Scheduler::new(db.clone(), shutdown_tx.subscribe());
    tokio::spawn(scheduler.run());
    tokio::spawn(run_sweep_loop(
        db.clone(),
        config.scheduler.sweep_interval_secs,
        shutdown_tx.subscribe(),
    ));

    // 6. Build daemon state
    let state = Arc::new(DaemonState {
        db,
        config,
        event_bus,
        roster,
        scheduler: scheduler_handle,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 7. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    state.event_bus.emit(events::Event {
        event_type: "DaemonStarted".to_string(),
        timestamp: turf_scheduler::unix_now(),
        payload: serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    });

    // 8. Run the RPC server until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown: stop the scheduler and sweep tasks too.
    info!("Daemon shutting down gracefully");
    let _ = shutdown_tx.send(());

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
