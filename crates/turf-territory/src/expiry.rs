//! Reverting lapsed territories to uncontrolled.
//!
//! Two functionally redundant paths run this: the event-armed trigger for
//! each claim, and the periodic sweep. Both go through the same guarded
//! clear, so whichever arrives second is a no-op.

use rusqlite::Connection;
use turf_db::queries::{nodes, territory, triggers};
use turf_types::{HexId, TriggerKind};

use crate::Result;

/// Outcome of an expiry attempt. The no-op variants are successes:
/// delayed triggers deliver at least once, so duplicates are expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// Control cleared and nodes released.
    Expired { nodes_unlinked: usize },
    /// Nobody controls the hex (already expired, or never claimed).
    Uncontrolled,
    /// A live challenge pins the territory; resolution owns its fate.
    Challenged,
    /// The control window has not lapsed yet.
    NotDue { control_ends_at: u64 },
}

/// Clear a territory whose control window has truly lapsed.
///
/// Re-reads the row and only clears when it is still unchallenged and
/// past its window; the trigger that armed this expiry is retired in the
/// same transaction.
pub fn expire(conn: &mut Connection, hex_id: HexId, now: u64) -> Result<ExpiryOutcome> {
    let tx = conn.transaction().map_err(turf_db::DbError::Sqlite)?;

    if territory::clear_if_lapsed(&tx, hex_id, now)? {
        let nodes_unlinked = nodes::unlink_hex(&tx, hex_id)?;
        triggers::mark_fired(&tx, TriggerKind::TerritoryExpiry, hex_id.as_i64(), now)?;
        tx.commit().map_err(turf_db::DbError::Sqlite)?;

        tracing::info!(%hex_id, nodes_unlinked, "territory expired");
        return Ok(ExpiryOutcome::Expired { nodes_unlinked });
    }

    // The guard refused; report why.
    let outcome = match territory::get(&tx, hex_id)? {
        None => ExpiryOutcome::Uncontrolled,
        Some(t) if !t.is_controlled() => ExpiryOutcome::Uncontrolled,
        Some(t) if t.active_challenge_id.is_some() => ExpiryOutcome::Challenged,
        Some(t) => ExpiryOutcome::NotDue {
            control_ends_at: t.control_ends_at.unwrap_or(u64::MAX),
        },
    };
    Ok(outcome)
}

/// Bulk-expire every territory whose window lapsed without a live
/// challenge. Returns the hexes cleared. Tolerates the event-armed path
/// having already cleared any of them.
pub fn sweep_expired(conn: &mut Connection, now: u64) -> Result<Vec<HexId>> {
    let candidates = territory::lapsed(conn, now)?;
    let mut cleared = Vec::new();
    for hex_id in candidates {
        if let ExpiryOutcome::Expired { .. } = expire(conn, hex_id, now)? {
            cleared.push(hex_id);
        }
    }
    if !cleared.is_empty() {
        tracing::info!(count = cleared.len(), "expiry sweep cleared territories");
    }
    Ok(cleared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_types::vault::TransactionReason;
    use turf_types::CONTROL_PERIOD_SECS;

    fn funded_db(guild_id: &str) -> Connection {
        let conn = turf_db::open_memory().expect("open");
        turf_vault::open_vault(&conn, guild_id, 0).expect("vault");
        turf_vault::credit(
            &conn,
            guild_id,
            10_000,
            TransactionReason::Deposit { memo: "seed".into() },
            0,
        )
        .expect("fund");
        conn
    }

    fn hex() -> HexId {
        turf_geo::cell_at(0.05, 0.05)
    }

    #[test]
    fn test_expire_after_window() {
        let mut conn = funded_db("g1");
        let c = turf_geo::center(hex());
        nodes::upsert(&conn, "n1", "Node", c.lat, c.lon, 0).expect("node");

        crate::stake::claim(&mut conn, hex(), "g1", 500, 100).expect("claim");
        assert_eq!(nodes::linked_to(&conn, hex()).expect("linked").len(), 1);

        let at = 100 + CONTROL_PERIOD_SECS;
        let out = expire(&mut conn, hex(), at).expect("expire");
        assert_eq!(out, ExpiryOutcome::Expired { nodes_unlinked: 1 });

        let t = territory::get(&conn, hex()).expect("get").expect("row kept");
        assert!(!t.is_controlled());
        assert_eq!(t.current_stake, 0);
        assert_eq!(t.controlled_at, None);
        assert_eq!(t.control_ends_at, None);
        assert!(nodes::linked_to(&conn, hex()).expect("linked").is_empty());

        // The expiry trigger was retired.
        assert!(triggers::pending(&conn).expect("pending").is_empty());
    }

    #[test]
    fn test_expire_early_and_repeat() {
        let mut conn = funded_db("g1");
        crate::stake::claim(&mut conn, hex(), "g1", 500, 100).expect("claim");

        let at = 100 + CONTROL_PERIOD_SECS;
        assert_eq!(
            expire(&mut conn, hex(), at - 1).expect("early"),
            ExpiryOutcome::NotDue {
                control_ends_at: at
            }
        );
        assert!(matches!(
            expire(&mut conn, hex(), at).expect("due"),
            ExpiryOutcome::Expired { .. }
        ));
        assert_eq!(
            expire(&mut conn, hex(), at + 1).expect("repeat"),
            ExpiryOutcome::Uncontrolled
        );
    }

    #[test]
    fn test_expire_never_claimed() {
        let mut conn = funded_db("g1");
        assert_eq!(
            expire(&mut conn, hex(), 1_000).expect("expire"),
            ExpiryOutcome::Uncontrolled
        );
    }

    #[test]
    fn test_sweep_clears_only_lapsed_unchallenged() {
        let mut conn = funded_db("g1");
        let h1 = turf_geo::cell_at(0.05, 0.05);
        let h2 = turf_geo::cell_at(0.30, 0.30);
        let h3 = turf_geo::cell_at(0.60, 0.60);

        crate::stake::claim(&mut conn, h1, "g1", 500, 0).expect("claim");
        crate::stake::claim(&mut conn, h2, "g1", 500, 500_000).expect("claim");
        crate::stake::claim(&mut conn, h3, "g1", 500, 0).expect("claim");
        // Pin h3 with a live challenge lock.
        let ch = turf_db::queries::challenge::insert(&conn, h3, "g1", 500, "g2", 500, 0, 10)
            .expect("challenge row");
        territory::set_active_challenge(&conn, h3, ch, CONTROL_PERIOD_SECS + 100)
            .expect("lock");

        // h1 lapsed; h2 still fresh; h3 lapsed but challenged.
        let cleared = sweep_expired(&mut conn, CONTROL_PERIOD_SECS).expect("sweep");
        assert_eq!(cleared, vec![h1]);

        assert!(!territory::get(&conn, h1).expect("get").expect("t").is_controlled());
        assert!(territory::get(&conn, h2).expect("get").expect("t").is_controlled());
        assert!(territory::get(&conn, h3).expect("get").expect("t").is_controlled());
    }

    #[test]
    fn test_sweep_idempotent_with_event_path() {
        let mut conn = funded_db("g1");
        crate::stake::claim(&mut conn, hex(), "g1", 500, 0).expect("claim");

        expire(&mut conn, hex(), CONTROL_PERIOD_SECS).expect("event path");
        let cleared = sweep_expired(&mut conn, CONTROL_PERIOD_SECS + 1).expect("sweep");
        assert!(cleared.is_empty());
    }
}
