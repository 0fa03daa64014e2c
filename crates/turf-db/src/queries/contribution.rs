//! Contribution row queries.

use rusqlite::{Connection, OptionalExtension};
use turf_types::territory::Contribution;
use turf_types::ChallengeId;

use crate::Result;

/// Accumulate one contribution event into the (challenge, player) row.
pub fn upsert(
    conn: &Connection,
    challenge_id: ChallengeId,
    username: &str,
    share_points: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO contributions (challenge_id, username, share_points, tune_count)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT(challenge_id, username) DO UPDATE SET
             share_points = share_points + excluded.share_points,
             tune_count = tune_count + 1",
        rusqlite::params![challenge_id, username, share_points as i64],
    )?;
    Ok(())
}

/// Fetch one player's contribution to one contest.
pub fn get(
    conn: &Connection,
    challenge_id: ChallengeId,
    username: &str,
) -> Result<Option<Contribution>> {
    let contribution = conn
        .query_row(
            "SELECT challenge_id, username, share_points, tune_count
             FROM contributions WHERE challenge_id = ?1 AND username = ?2",
            rusqlite::params![challenge_id, username],
            |row| {
                Ok(Contribution {
                    challenge_id: row.get(0)?,
                    username: row.get(1)?,
                    share_points: row.get::<_, i64>(2)? as u64,
                    tune_count: row.get::<_, i64>(3)? as u64,
                })
            },
        )
        .optional()?;
    Ok(contribution)
}

/// All contributions to one contest, highest scorers first.
pub fn for_challenge(conn: &Connection, challenge_id: ChallengeId) -> Result<Vec<Contribution>> {
    let mut stmt = conn.prepare(
        "SELECT challenge_id, username, share_points, tune_count
         FROM contributions WHERE challenge_id = ?1
         ORDER BY share_points DESC, username",
    )?;
    let rows = stmt
        .query_map([challenge_id], |row| {
            Ok(Contribution {
                challenge_id: row.get(0)?,
                username: row.get(1)?,
                share_points: row.get::<_, i64>(2)? as u64,
                tune_count: row.get::<_, i64>(3)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
