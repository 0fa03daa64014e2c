//! Tokio tasks driving the trigger and sweep paths.

use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::{fire_due, sweep, unix_now, IDLE_RECHECK_SECS};

/// Handle for waking the scheduler when a new trigger is armed.
///
/// Arming is fire-and-forget for callers: the trigger row is already
/// durable, so a missed notification only delays firing until the next
/// periodic recheck.
#[derive(Clone)]
pub struct SchedulerHandle {
    wakeup_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Nudge the scheduler to re-read the trigger table.
    pub fn notify(&self) {
        // A full buffer already guarantees a wakeup is queued.
        let _ = self.wakeup_tx.try_send(());
    }
}

/// The trigger-firing task.
///
/// Sleeps until the earliest pending `fire_at`, wakes early when a new
/// trigger is armed, and fires everything due. All state lives in the
/// database; restarting the process restarts the loop with nothing lost.
pub struct Scheduler {
    db: Arc<Mutex<Connection>>,
    wakeup_rx: mpsc::Receiver<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Scheduler {
    /// Create the scheduler and its wakeup handle.
    pub fn new(
        db: Arc<Mutex<Connection>>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> (Self, SchedulerHandle) {
        let (wakeup_tx, wakeup_rx) = mpsc::channel(16);
        (
            Self {
                db,
                wakeup_rx,
                shutdown_rx,
            },
            SchedulerHandle { wakeup_tx },
        )
    }

    /// Run until shutdown.
    pub async fn run(mut self) {
        info!("trigger scheduler started");
        loop {
            let wait_secs = {
                let conn = self.db.lock().await;
                match turf_db::queries::triggers::next_fire_at(&conn) {
                    Ok(Some(fire_at)) => fire_at.saturating_sub(unix_now()),
                    Ok(None) => IDLE_RECHECK_SECS,
                    Err(e) => {
                        warn!(error = %e, "failed to read trigger table");
                        IDLE_RECHECK_SECS
                    }
                }
            };

            if wait_secs > 0 {
                debug!(wait_secs, "scheduler sleeping");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(wait_secs)) => {}
                    _ = self.wakeup_rx.recv() => {
                        // New trigger armed; recompute the deadline.
                        continue;
                    }
                    _ = self.shutdown_rx.recv() => {
                        info!("trigger scheduler stopping");
                        return;
                    }
                }
            }

            let mut conn = self.db.lock().await;
            match fire_due(&mut conn, unix_now()) {
                Ok(report) if report.fired + report.rearmed + report.errors > 0 => {
                    debug!(
                        fired = report.fired,
                        rearmed = report.rearmed,
                        errors = report.errors,
                        "trigger pass complete"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "trigger pass failed"),
            }
        }
    }
}

/// The periodic sweep task. Runs [`sweep::run`] at every epoch-aligned
/// boundary of `interval_secs` until shutdown.
pub async fn run_sweep_loop(
    db: Arc<Mutex<Connection>>,
    interval_secs: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!(interval_secs, "sweep loop started");
    loop {
        let wait = sweep::seconds_until_next_sweep(unix_now(), interval_secs);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(wait)) => {}
            _ = shutdown_rx.recv() => {
                info!("sweep loop stopping");
                return;
            }
        }

        let mut conn = db.lock().await;
        if let Err(e) = sweep::run(&mut conn, unix_now()) {
            warn!(error = %e, "sweep failed");
        }
    }
}
