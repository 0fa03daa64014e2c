//! Integration test: durable triggers survive restarts, and the sweep
//! recovers even when every trigger is lost.
//!
//! Triggers are rows written in the same transaction as the operation
//! that armed them; "restart" here is dropping every connection and
//! reopening the database file.

use std::path::PathBuf;

use turf_types::vault::TransactionReason;
use turf_types::{HexId, TriggerKind, CONTROL_PERIOD_SECS};

const BASE_TIME: u64 = 1_700_000_000;

fn temp_db_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("turf-sched-{}-{name}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn fund_guild(conn: &rusqlite::Connection, guild_id: &str, amount: u64) {
    turf_vault::open_vault(conn, guild_id, BASE_TIME).expect("vault");
    turf_vault::credit(
        conn,
        guild_id,
        amount,
        TransactionReason::Deposit { memo: "seed".into() },
        BASE_TIME,
    )
    .expect("fund");
}

fn hex() -> HexId {
    turf_geo::cell_at(35.68, 139.69)
}

#[test]
fn triggers_rearm_across_restart() {
    let path = temp_db_path("restart");

    // First process lifetime: claim a hex, which arms an expiry trigger.
    {
        let mut conn = turf_db::open(&path).expect("open");
        fund_guild(&conn, "guild-a", 1_000);
        turf_territory::stake::claim(&mut conn, hex(), "guild-a", 500, BASE_TIME).expect("claim");
    }

    // Second lifetime: the pending trigger is still there.
    let mut conn = turf_db::open(&path).expect("reopen");
    let pending = turf_db::queries::triggers::pending(&conn).expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, TriggerKind::TerritoryExpiry);
    assert_eq!(pending[0].fire_at, BASE_TIME + CONTROL_PERIOD_SECS);

    // And firing it after the window does the real work.
    let report =
        turf_scheduler::fire_due(&mut conn, BASE_TIME + CONTROL_PERIOD_SECS).expect("fire");
    assert_eq!(report.fired, 1);
    assert!(!turf_db::queries::territory::get(&conn, hex())
        .expect("get")
        .expect("territory")
        .is_controlled());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn resolution_trigger_survives_restart() {
    let path = temp_db_path("resolution");
    let ends_at;

    {
        let mut conn = turf_db::open(&path).expect("open");
        fund_guild(&conn, "guild-a", 1_000);
        fund_guild(&conn, "guild-b", 1_000);
        turf_territory::stake::claim(&mut conn, hex(), "guild-a", 500, BASE_TIME).expect("claim");
        let c = turf_challenge::admission::open(&mut conn, hex(), "guild-b", 500, BASE_TIME + 5)
            .expect("challenge");
        ends_at = c.ends_at;
    }

    let mut conn = turf_db::open(&path).expect("reopen");
    let report = turf_scheduler::fire_due(&mut conn, ends_at).expect("fire");
    assert_eq!(report.fired, 1);

    // Tie resolved in the defender's favor; the lock is gone and the
    // attacker's stake paid out.
    let t = turf_db::queries::territory::get(&conn, hex())
        .expect("get")
        .expect("territory");
    assert_eq!(t.controlling_guild_id.as_deref(), Some("guild-a"));
    assert_eq!(t.active_challenge_id, None);
    assert_eq!(turf_vault::balance(&conn, "guild-a").expect("balance"), 1_000);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn sweep_is_the_backstop_when_triggers_vanish() {
    let mut conn = turf_db::open_memory().expect("open");
    fund_guild(&conn, "guild-a", 1_000);
    fund_guild(&conn, "guild-b", 1_000);

    turf_territory::stake::claim(&mut conn, hex(), "guild-a", 500, BASE_TIME).expect("claim");
    let c = turf_challenge::admission::open(&mut conn, hex(), "guild-b", 500, BASE_TIME + 5)
        .expect("challenge");

    // Lose every armed trigger (simulated scheduler-store corruption).
    conn.execute("DELETE FROM scheduled_triggers", [])
        .expect("drop triggers");

    // The trigger path has nothing to do...
    let report = turf_scheduler::fire_due(&mut conn, c.ends_at + 10).expect("fire");
    assert_eq!(report.fired, 0);

    // ...but the sweep resolves the contest anyway.
    let report = turf_scheduler::sweep::run(&mut conn, c.ends_at + 10).expect("sweep");
    assert_eq!(report.challenges_resolved, 1);
    assert!(turf_db::queries::challenge::get(&conn, c.id)
        .expect("get")
        .expect("challenge")
        .resolved);
}

#[test]
fn duplicate_delivery_is_harmless() {
    let mut conn = turf_db::open_memory().expect("open");
    fund_guild(&conn, "guild-a", 1_000);
    fund_guild(&conn, "guild-b", 1_000);

    turf_territory::stake::claim(&mut conn, hex(), "guild-a", 500, BASE_TIME).expect("claim");
    let c = turf_challenge::admission::open(&mut conn, hex(), "guild-b", 500, BASE_TIME + 5)
        .expect("challenge");

    turf_scheduler::fire_due(&mut conn, c.ends_at).expect("first delivery");
    let balance_after = turf_vault::balance(&conn, "guild-a").expect("balance");

    // Re-arm the already-handled trigger, as an at-least-once scheduler may.
    turf_db::queries::triggers::arm(
        &conn,
        TriggerKind::ChallengeResolution,
        c.id,
        c.ends_at,
        c.ends_at,
    )
    .expect("re-arm");
    let report = turf_scheduler::fire_due(&mut conn, c.ends_at + 1).expect("second delivery");
    assert_eq!(report.fired, 1, "duplicate retires itself");

    // No double payout, no state change.
    assert_eq!(
        turf_vault::balance(&conn, "guild-a").expect("balance"),
        balance_after
    );
}
