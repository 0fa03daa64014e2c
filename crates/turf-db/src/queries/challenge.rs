//! Challenge row queries.

use rusqlite::{Connection, OptionalExtension};
use turf_types::territory::{Challenge, Side};
use turf_types::{ChallengeId, HexId};

use crate::Result;

fn row_to_challenge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Challenge> {
    Ok(Challenge {
        id: row.get(0)?,
        hex_id: HexId::from_i64(row.get(1)?),
        defender_guild_id: row.get(2)?,
        defender_stake: row.get::<_, i64>(3)? as u64,
        attacker_guild_id: row.get(4)?,
        attacker_stake: row.get::<_, i64>(5)? as u64,
        starts_at: row.get::<_, i64>(6)? as u64,
        ends_at: row.get::<_, i64>(7)? as u64,
        resolved: row.get::<_, i64>(8)? != 0,
        defender_score: row.get::<_, i64>(9)? as u64,
        attacker_score: row.get::<_, i64>(10)? as u64,
    })
}

const CHALLENGE_COLS: &str = "id, hex_id, defender_guild_id, defender_stake, attacker_guild_id, \
                              attacker_stake, starts_at, ends_at, resolved, defender_score, \
                              attacker_score";

/// Insert a new challenge row and return its id.
#[allow(clippy::too_many_arguments)]
pub fn insert(
    conn: &Connection,
    hex_id: HexId,
    defender_guild_id: &str,
    defender_stake: u64,
    attacker_guild_id: &str,
    attacker_stake: u64,
    starts_at: u64,
    ends_at: u64,
) -> Result<ChallengeId> {
    conn.execute(
        "INSERT INTO challenges
             (hex_id, defender_guild_id, defender_stake, attacker_guild_id,
              attacker_stake, starts_at, ends_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            hex_id.as_i64(),
            defender_guild_id,
            defender_stake as i64,
            attacker_guild_id,
            attacker_stake as i64,
            starts_at as i64,
            ends_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch one challenge row.
pub fn get(conn: &Connection, id: ChallengeId) -> Result<Option<Challenge>> {
    let challenge = conn
        .query_row(
            &format!("SELECT {CHALLENGE_COLS} FROM challenges WHERE id = ?1"),
            [id],
            row_to_challenge,
        )
        .optional()?;
    Ok(challenge)
}

/// Flip a challenge to resolved, exactly once and only after its window
/// closed. Returns false when it was already resolved or is not yet due.
pub fn mark_resolved_if_due(conn: &Connection, id: ChallengeId, now: u64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE challenges SET resolved = 1
         WHERE id = ?1 AND resolved = 0 AND ends_at <= ?2",
        rusqlite::params![id, now as i64],
    )?;
    Ok(changed == 1)
}

/// Add contribution points to one side's score while the contest is live.
pub fn add_score(conn: &Connection, id: ChallengeId, side: Side, points: u64) -> Result<bool> {
    let sql = match side {
        Side::Defender => {
            "UPDATE challenges SET defender_score = defender_score + ?2
             WHERE id = ?1 AND resolved = 0"
        }
        Side::Attacker => {
            "UPDATE challenges SET attacker_score = attacker_score + ?2
             WHERE id = ?1 AND resolved = 0"
        }
    };
    let changed = conn.execute(sql, rusqlite::params![id, points as i64])?;
    Ok(changed == 1)
}

/// Unresolved challenges whose window has closed (sweep backstop).
pub fn overdue_unresolved(conn: &Connection, now: u64) -> Result<Vec<ChallengeId>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM challenges WHERE resolved = 0 AND ends_at <= ?1 ORDER BY ends_at",
    )?;
    let rows = stmt
        .query_map([now as i64], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::territory;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    const HEX: HexId = HexId(42);

    fn seed_challenge(conn: &Connection) -> ChallengeId {
        territory::claim_if_uncontrolled(conn, HEX, "g1", 500, 100, 10_000, 1.0, 2.0)
            .expect("claim");
        insert(conn, HEX, "g1", 500, "g2", 500, 100, 200).expect("insert")
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_db();
        let id = seed_challenge(&conn);

        let c = get(&conn, id).expect("get").expect("exists");
        assert_eq!(c.hex_id, HEX);
        assert_eq!(c.defender_guild_id, "g1");
        assert_eq!(c.attacker_guild_id, "g2");
        assert!(!c.resolved);
        assert_eq!(c.defender_score, 0);
    }

    #[test]
    fn test_resolve_exactly_once() {
        let conn = test_db();
        let id = seed_challenge(&conn);

        assert!(!mark_resolved_if_due(&conn, id, 199).expect("early"));
        assert!(mark_resolved_if_due(&conn, id, 200).expect("due"));
        assert!(!mark_resolved_if_due(&conn, id, 201).expect("repeat"));

        let c = get(&conn, id).expect("get").expect("exists");
        assert!(c.resolved);
    }

    #[test]
    fn test_scores_accumulate_per_side() {
        let conn = test_db();
        let id = seed_challenge(&conn);

        assert!(add_score(&conn, id, Side::Defender, 50).expect("score"));
        assert!(add_score(&conn, id, Side::Attacker, 30).expect("score"));
        assert!(add_score(&conn, id, Side::Attacker, 40).expect("score"));

        let c = get(&conn, id).expect("get").expect("exists");
        assert_eq!(c.defender_score, 50);
        assert_eq!(c.attacker_score, 70);
    }

    #[test]
    fn test_no_score_after_resolution() {
        let conn = test_db();
        let id = seed_challenge(&conn);
        mark_resolved_if_due(&conn, id, 200).expect("resolve");

        assert!(!add_score(&conn, id, Side::Defender, 50).expect("late score"));
        let c = get(&conn, id).expect("get").expect("exists");
        assert_eq!(c.defender_score, 0);
    }

    #[test]
    fn test_overdue_listing() {
        let conn = test_db();
        let id = seed_challenge(&conn);

        assert!(overdue_unresolved(&conn, 150).expect("none yet").is_empty());
        assert_eq!(overdue_unresolved(&conn, 200).expect("due"), vec![id]);

        mark_resolved_if_due(&conn, id, 200).expect("resolve");
        assert!(overdue_unresolved(&conn, 300).expect("resolved gone").is_empty());
    }
}
