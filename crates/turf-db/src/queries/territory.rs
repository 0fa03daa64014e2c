//! Territory row queries.
//!
//! All state transitions on a territory are conditional updates guarded by
//! the current state, so concurrent claim/challenge/expiry on the same hex
//! linearize: exactly one caller's guard matches, the rest see zero rows
//! changed.

use rusqlite::{Connection, OptionalExtension};
use turf_types::territory::Territory;
use turf_types::HexId;

use crate::Result;

fn row_to_territory(row: &rusqlite::Row<'_>) -> rusqlite::Result<Territory> {
    Ok(Territory {
        hex_id: HexId::from_i64(row.get(0)?),
        controlling_guild_id: row.get(1)?,
        current_stake: row.get::<_, i64>(2)? as u64,
        controlled_at: row.get::<_, Option<i64>>(3)?.map(|t| t as u64),
        control_ends_at: row.get::<_, Option<i64>>(4)?.map(|t| t as u64),
        active_challenge_id: row.get(5)?,
        center_lat: row.get(6)?,
        center_lon: row.get(7)?,
    })
}

const TERRITORY_COLS: &str = "hex_id, controlling_guild_id, current_stake, controlled_at, \
                              control_ends_at, active_challenge_id, center_lat, center_lon";

/// Fetch one territory row.
pub fn get(conn: &Connection, hex_id: HexId) -> Result<Option<Territory>> {
    let territory = conn
        .query_row(
            &format!("SELECT {TERRITORY_COLS} FROM territories WHERE hex_id = ?1"),
            [hex_id.as_i64()],
            row_to_territory,
        )
        .optional()?;
    Ok(territory)
}

/// List every territory currently under control.
pub fn list_controlled(conn: &Connection) -> Result<Vec<Territory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TERRITORY_COLS} FROM territories
         WHERE controlling_guild_id IS NOT NULL ORDER BY hex_id"
    ))?;
    let rows = stmt
        .query_map([], row_to_territory)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Take control of a hex if and only if nobody controls it.
///
/// Create-or-overwrite keyed by `hex_id`: inserts the row on first claim,
/// or refreshes an existing uncontrolled row. Returns false when the hex
/// is already controlled — the caller lost the race.
#[allow(clippy::too_many_arguments)]
pub fn claim_if_uncontrolled(
    conn: &Connection,
    hex_id: HexId,
    guild_id: &str,
    stake: u64,
    now: u64,
    control_ends_at: u64,
    center_lat: f64,
    center_lon: f64,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT INTO territories
             (hex_id, controlling_guild_id, current_stake, controlled_at,
              control_ends_at, active_challenge_id, center_lat, center_lon)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)
         ON CONFLICT(hex_id) DO UPDATE SET
             controlling_guild_id = excluded.controlling_guild_id,
             current_stake = excluded.current_stake,
             controlled_at = excluded.controlled_at,
             control_ends_at = excluded.control_ends_at
         WHERE territories.controlling_guild_id IS NULL",
        rusqlite::params![
            hex_id.as_i64(),
            guild_id,
            stake as i64,
            now as i64,
            control_ends_at as i64,
            center_lat,
            center_lon,
        ],
    )?;
    Ok(changed == 1)
}

/// Lock a controlled hex for a new challenge.
///
/// Sets `active_challenge_id` and extends the control window to at least
/// `min_control_ends_at`, but only if no other challenge is live. Returns
/// false when the lock is already held or the hex is uncontrolled.
pub fn set_active_challenge(
    conn: &Connection,
    hex_id: HexId,
    challenge_id: i64,
    min_control_ends_at: u64,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE territories
         SET active_challenge_id = ?2,
             control_ends_at = MAX(COALESCE(control_ends_at, 0), ?3)
         WHERE hex_id = ?1
           AND controlling_guild_id IS NOT NULL
           AND active_challenge_id IS NULL",
        rusqlite::params![hex_id.as_i64(), challenge_id, min_control_ends_at as i64],
    )?;
    Ok(changed == 1)
}

/// Hand control to the winning attacker and clear the challenge lock.
pub fn transfer_control(
    conn: &Connection,
    hex_id: HexId,
    new_guild_id: &str,
    new_stake: u64,
    now: u64,
    control_ends_at: u64,
) -> Result<()> {
    conn.execute(
        "UPDATE territories
         SET controlling_guild_id = ?2,
             current_stake = ?3,
             controlled_at = ?4,
             control_ends_at = ?5,
             active_challenge_id = NULL
         WHERE hex_id = ?1",
        rusqlite::params![
            hex_id.as_i64(),
            new_guild_id,
            new_stake as i64,
            now as i64,
            control_ends_at as i64,
        ],
    )?;
    Ok(())
}

/// Keep the defender in place after a held challenge: clear the lock and
/// start a fresh control window.
pub fn confirm_control(conn: &Connection, hex_id: HexId, control_ends_at: u64) -> Result<()> {
    conn.execute(
        "UPDATE territories
         SET active_challenge_id = NULL,
             control_ends_at = ?2
         WHERE hex_id = ?1",
        rusqlite::params![hex_id.as_i64(), control_ends_at as i64],
    )?;
    Ok(())
}

/// Revert a territory to uncontrolled if its window has truly lapsed.
///
/// Guarded against live challenges and already-cleared rows, so the
/// event-armed path and the periodic sweep can both run it safely.
pub fn clear_if_lapsed(conn: &Connection, hex_id: HexId, now: u64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE territories
         SET controlling_guild_id = NULL,
             current_stake = 0,
             controlled_at = NULL,
             control_ends_at = NULL
         WHERE hex_id = ?1
           AND controlling_guild_id IS NOT NULL
           AND active_challenge_id IS NULL
           AND control_ends_at <= ?2",
        rusqlite::params![hex_id.as_i64(), now as i64],
    )?;
    Ok(changed == 1)
}

/// Hexes whose control window has lapsed without a live challenge.
pub fn lapsed(conn: &Connection, now: u64) -> Result<Vec<HexId>> {
    let mut stmt = conn.prepare(
        "SELECT hex_id FROM territories
         WHERE controlling_guild_id IS NOT NULL
           AND active_challenge_id IS NULL
           AND control_ends_at <= ?1
         ORDER BY control_ends_at",
    )?;
    let rows = stmt
        .query_map([now as i64], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(HexId::from_i64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    const HEX: HexId = HexId(42);

    #[test]
    fn test_claim_uncontrolled() {
        let conn = test_db();
        assert!(claim_if_uncontrolled(&conn, HEX, "g1", 500, 100, 200, 1.0, 2.0).expect("claim"));

        let t = get(&conn, HEX).expect("get").expect("exists");
        assert_eq!(t.controlling_guild_id.as_deref(), Some("g1"));
        assert_eq!(t.current_stake, 500);
        assert_eq!(t.control_ends_at, Some(200));
    }

    #[test]
    fn test_second_claim_loses() {
        let conn = test_db();
        assert!(claim_if_uncontrolled(&conn, HEX, "g1", 500, 100, 200, 1.0, 2.0).expect("first"));
        assert!(!claim_if_uncontrolled(&conn, HEX, "g2", 900, 101, 201, 1.0, 2.0).expect("second"));

        let t = get(&conn, HEX).expect("get").expect("exists");
        assert_eq!(t.controlling_guild_id.as_deref(), Some("g1"));
    }

    #[test]
    fn test_reclaim_after_clear() {
        let conn = test_db();
        assert!(claim_if_uncontrolled(&conn, HEX, "g1", 500, 100, 200, 1.0, 2.0).expect("claim"));
        assert!(clear_if_lapsed(&conn, HEX, 200).expect("clear"));
        assert!(claim_if_uncontrolled(&conn, HEX, "g2", 300, 300, 400, 1.0, 2.0).expect("reclaim"));

        let t = get(&conn, HEX).expect("get").expect("exists");
        assert_eq!(t.controlling_guild_id.as_deref(), Some("g2"));
        assert_eq!(t.current_stake, 300);
    }

    #[test]
    fn test_challenge_lock_exclusive() {
        let conn = test_db();
        claim_if_uncontrolled(&conn, HEX, "g1", 500, 100, 200, 1.0, 2.0).expect("claim");

        assert!(set_active_challenge(&conn, HEX, 7, 300).expect("lock"));
        assert!(!set_active_challenge(&conn, HEX, 8, 300).expect("second lock"));

        let t = get(&conn, HEX).expect("get").expect("exists");
        assert_eq!(t.active_challenge_id, Some(7));
        // Window extended past the original 200.
        assert_eq!(t.control_ends_at, Some(300));
    }

    #[test]
    fn test_challenge_lock_never_shrinks_window() {
        let conn = test_db();
        claim_if_uncontrolled(&conn, HEX, "g1", 500, 100, 1_000, 1.0, 2.0).expect("claim");
        assert!(set_active_challenge(&conn, HEX, 7, 500).expect("lock"));

        let t = get(&conn, HEX).expect("get").expect("exists");
        assert_eq!(t.control_ends_at, Some(1_000));
    }

    #[test]
    fn test_lock_requires_controller() {
        let conn = test_db();
        assert!(!set_active_challenge(&conn, HEX, 7, 300).expect("lock on missing row"));
    }

    #[test]
    fn test_clear_respects_live_challenge() {
        let conn = test_db();
        claim_if_uncontrolled(&conn, HEX, "g1", 500, 100, 200, 1.0, 2.0).expect("claim");
        set_active_challenge(&conn, HEX, 7, 300).expect("lock");

        // Window lapsed but a challenge is live: clear must refuse.
        assert!(!clear_if_lapsed(&conn, HEX, 400).expect("clear"));
    }

    #[test]
    fn test_clear_not_yet_due() {
        let conn = test_db();
        claim_if_uncontrolled(&conn, HEX, "g1", 500, 100, 200, 1.0, 2.0).expect("claim");
        assert!(!clear_if_lapsed(&conn, HEX, 199).expect("early clear"));
        assert!(clear_if_lapsed(&conn, HEX, 200).expect("due clear"));
        // Second clear is a no-op.
        assert!(!clear_if_lapsed(&conn, HEX, 201).expect("repeat clear"));
    }

    #[test]
    fn test_transfer_control() {
        let conn = test_db();
        claim_if_uncontrolled(&conn, HEX, "g1", 500, 100, 200, 1.0, 2.0).expect("claim");
        set_active_challenge(&conn, HEX, 7, 300).expect("lock");

        transfer_control(&conn, HEX, "g2", 700, 250, 900).expect("transfer");
        let t = get(&conn, HEX).expect("get").expect("exists");
        assert_eq!(t.controlling_guild_id.as_deref(), Some("g2"));
        assert_eq!(t.current_stake, 700);
        assert_eq!(t.controlled_at, Some(250));
        assert_eq!(t.control_ends_at, Some(900));
        assert_eq!(t.active_challenge_id, None);
    }

    #[test]
    fn test_lapsed_listing() {
        let conn = test_db();
        claim_if_uncontrolled(&conn, HexId(1), "g1", 500, 0, 100, 0.0, 0.0).expect("claim");
        claim_if_uncontrolled(&conn, HexId(2), "g2", 500, 0, 300, 0.0, 0.0).expect("claim");
        claim_if_uncontrolled(&conn, HexId(3), "g3", 500, 0, 150, 0.0, 0.0).expect("claim");
        set_active_challenge(&conn, HexId(3), 9, 150).expect("lock");

        // Hex 3 lapsed but challenged; hex 2 not due.
        let due = lapsed(&conn, 200).expect("lapsed");
        assert_eq!(due, vec![HexId(1)]);
    }
}
