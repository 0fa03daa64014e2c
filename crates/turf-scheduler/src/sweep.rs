//! Periodic safety-net sweep.
//!
//! Independent of the event-armed triggers: even if every armed trigger
//! was lost to a crash, the sweep alone eventually resolves every overdue
//! contest and clears every lapsed territory. Both halves run the same
//! guarded operations as the trigger path, so overlap is harmless.

use rusqlite::Connection;
use turf_challenge::resolution::{self, ResolutionOutcome};
use turf_db::queries::challenge;
use turf_territory::expiry;

use crate::Result;

/// What one sweep pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub challenges_resolved: usize,
    pub territories_cleared: usize,
    pub errors: usize,
}

/// Seconds until the next sweep boundary for the given interval.
///
/// Boundaries are aligned to the Unix epoch (a 24 h interval sweeps at
/// 00:00 UTC), matching the fixed daily schedule.
pub fn seconds_until_next_sweep(now: u64, interval_secs: u64) -> u64 {
    let interval = interval_secs.max(1);
    interval - (now % interval)
}

/// One full sweep pass: resolve every overdue contest, then clear every
/// lapsed unchallenged territory.
///
/// Resolution runs first so a contested hex whose window lapsed gets its
/// outcome (and a fresh control window) before the expiry half looks at
/// it. Individual failures are logged and skipped; the next sweep
/// retries them.
pub fn run(conn: &mut Connection, now: u64) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    for challenge_id in challenge::overdue_unresolved(conn, now)? {
        match resolution::resolve(conn, challenge_id, now) {
            Ok(ResolutionOutcome::AttackerWon { .. })
            | Ok(ResolutionOutcome::DefenderHeld { .. }) => report.challenges_resolved += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(challenge_id, error = %e, "sweep: resolution failed");
                report.errors += 1;
            }
        }
    }

    match expiry::sweep_expired(conn, now) {
        Ok(cleared) => report.territories_cleared = cleared.len(),
        Err(e) => {
            tracing::warn!(error = %e, "sweep: expiry pass failed");
            report.errors += 1;
        }
    }

    tracing::info!(
        challenges_resolved = report.challenges_resolved,
        territories_cleared = report.territories_cleared,
        errors = report.errors,
        "sweep complete"
    );

    Ok(report)
}
