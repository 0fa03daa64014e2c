//! # turf-scheduler
//!
//! Durable delayed execution for territory expiry and challenge
//! resolution.
//!
//! Triggers are rows in `scheduled_triggers`, written inside the same
//! transaction as the operation that armed them, so they survive process
//! restarts: on startup the scheduler simply reads the table again.
//! Delivery is at-least-once — both handlers re-validate terminal state
//! before mutating — and a failed handler is re-armed a minute out rather
//! than retried hot, with the periodic sweep as the ultimate backstop.
//!
//! ## Modules
//!
//! - [`sweep`] — the periodic batch pass (resolve overdue, expire lapsed)
//! - [`runtime`] — the tokio tasks driving both paths

pub mod runtime;
pub mod sweep;

use rusqlite::Connection;
use turf_challenge::resolution::{self, ResolutionOutcome};
use turf_db::queries::triggers;
use turf_territory::expiry::{self, ExpiryOutcome};
use turf_types::{HexId, TriggerKind};

/// Delay before retrying a trigger whose handler failed.
pub const RETRY_DELAY_SECS: u64 = 60;

/// How often an idle scheduler re-reads the trigger table anyway.
pub const IDLE_RECHECK_SECS: u64 = 60;

/// Error types for scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Db(#[from] turf_db::DbError),

    #[error(transparent)]
    Territory(#[from] turf_territory::TerritoryError),

    #[error(transparent)]
    Challenge(#[from] turf_challenge::ChallengeError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Wall clock in Unix epoch seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// What one firing pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FireReport {
    /// Triggers that reached a terminal outcome.
    pub fired: usize,
    /// Triggers pushed to a later fire time (fired early or handler failed).
    pub rearmed: usize,
    /// Handler failures (logged; the trigger was re-armed for retry).
    pub errors: usize,
}

/// Fire every due trigger once.
///
/// Handler failures never abort the pass: the failing trigger is re-armed
/// [`RETRY_DELAY_SECS`] out and the rest still fire.
pub fn fire_due(conn: &mut Connection, now: u64) -> Result<FireReport> {
    let due = triggers::due(conn, now)?;
    let mut report = FireReport::default();

    for trigger in due {
        match fire_one(conn, trigger.kind, trigger.target_id, now) {
            Ok(Fired::Done) => report.fired += 1,
            Ok(Fired::Rearmed) => report.rearmed += 1,
            Err(e) => {
                tracing::warn!(
                    kind = trigger.kind.as_str(),
                    target_id = trigger.target_id,
                    error = %e,
                    "trigger handler failed; retrying later"
                );
                report.errors += 1;
                if let Err(e) =
                    triggers::arm(conn, trigger.kind, trigger.target_id, now + RETRY_DELAY_SECS, now)
                {
                    tracing::error!(
                        kind = trigger.kind.as_str(),
                        target_id = trigger.target_id,
                        error = %e,
                        "failed to re-arm trigger; sweep will recover it"
                    );
                }
            }
        }
    }

    Ok(report)
}

enum Fired {
    Done,
    Rearmed,
}

fn fire_one(conn: &mut Connection, kind: TriggerKind, target_id: i64, now: u64) -> Result<Fired> {
    match kind {
        TriggerKind::TerritoryExpiry => {
            let hex_id = HexId::from_i64(target_id);
            match expiry::expire(conn, hex_id, now)? {
                // expire() retires its own trigger inside the transaction.
                ExpiryOutcome::Expired { .. } => Ok(Fired::Done),
                ExpiryOutcome::Uncontrolled => {
                    triggers::mark_fired(conn, kind, target_id, now)?;
                    Ok(Fired::Done)
                }
                // Resolution will restart the expiry clock for the winner.
                ExpiryOutcome::Challenged => {
                    triggers::mark_fired(conn, kind, target_id, now)?;
                    Ok(Fired::Done)
                }
                ExpiryOutcome::NotDue { control_ends_at } => {
                    triggers::arm(conn, kind, target_id, control_ends_at, now)?;
                    Ok(Fired::Rearmed)
                }
            }
        }
        TriggerKind::ChallengeResolution => {
            match resolution::resolve(conn, target_id, now) {
                // resolve() retires its own trigger inside the transaction.
                Ok(ResolutionOutcome::AttackerWon { .. })
                | Ok(ResolutionOutcome::DefenderHeld { .. }) => Ok(Fired::Done),
                Ok(ResolutionOutcome::AlreadyResolved) => {
                    triggers::mark_fired(conn, kind, target_id, now)?;
                    Ok(Fired::Done)
                }
                Ok(ResolutionOutcome::NotDue { ends_at }) => {
                    triggers::arm(conn, kind, target_id, ends_at, now)?;
                    Ok(Fired::Rearmed)
                }
                // A trigger pointing at a missing row is an orphan; retire it.
                Err(turf_challenge::ChallengeError::UnknownChallenge(id)) => {
                    tracing::warn!(challenge_id = id, "retiring orphan resolution trigger");
                    triggers::mark_fired(conn, kind, target_id, now)?;
                    Ok(Fired::Done)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}
