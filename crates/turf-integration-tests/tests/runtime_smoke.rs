//! Integration test: the live scheduler task drives a past-due trigger
//! to completion without any external nudge.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use turf_scheduler::runtime::Scheduler;
use turf_scheduler::unix_now;
use turf_types::vault::TransactionReason;
use turf_types::CONTROL_PERIOD_SECS;

#[tokio::test]
async fn scheduler_task_fires_overdue_expiry() {
    let mut conn = turf_db::open_memory().expect("open");
    turf_vault::open_vault(&conn, "guild-a", 0).expect("vault");
    turf_vault::credit(
        &conn,
        "guild-a",
        1_000,
        TransactionReason::Deposit { memo: "seed".into() },
        0,
    )
    .expect("fund");

    // Claim far enough in the past that the control window already lapsed.
    let claimed_at = unix_now() - CONTROL_PERIOD_SECS - 10;
    let hex = turf_geo::cell_at(48.85, 2.35);
    turf_territory::stake::claim(&mut conn, hex, "guild-a", 500, claimed_at).expect("claim");

    let db = Arc::new(Mutex::new(conn));
    let (shutdown_tx, _keep) = broadcast::channel(1);
    let (scheduler, _handle) = Scheduler::new(db.clone(), shutdown_tx.subscribe());
    let task = tokio::spawn(scheduler.run());

    // The first loop iteration sees an already-due trigger.
    tokio::time::sleep(Duration::from_millis(300)).await;

    {
        let conn = db.lock().await;
        let t = turf_db::queries::territory::get(&conn, hex)
            .expect("get")
            .expect("territory");
        assert!(!t.is_controlled(), "scheduler should have expired the hex");
        assert!(turf_db::queries::triggers::pending(&conn)
            .expect("pending")
            .is_empty());
    }

    shutdown_tx.send(()).expect("shutdown");
    task.await.expect("scheduler task");
}
