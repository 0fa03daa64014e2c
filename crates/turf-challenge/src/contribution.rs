//! Contest scoring during the challenge window.
//!
//! Contribution tracking is a secondary effect of primary gameplay
//! (mining/tuning happens elsewhere), so a call that cannot count returns
//! a named [`SkipReason`] instead of an error, and the daemon handler
//! additionally swallows real failures after logging them.

use rusqlite::Connection;
use turf_db::queries::{challenge, contribution, territory};
use turf_types::territory::Side;
use turf_types::{ChallengeId, HexId, Roster};

use crate::Result;

/// Why a contribution event was not counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The hex has no live, unresolved challenge.
    NoActiveChallenge,
    /// The event arrived outside `[starts_at, ends_at)`.
    OutsideWindow,
    /// The player belongs to no guild.
    UnknownPlayer,
    /// The player's guild is neither defender nor attacker.
    NotAContestant,
}

impl SkipReason {
    /// Stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoActiveChallenge => "no active challenge",
            SkipReason::OutsideWindow => "outside contest window",
            SkipReason::UnknownPlayer => "player has no guild",
            SkipReason::NotAContestant => "guild not a contestant",
        }
    }
}

/// Result of one contribution event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContributionOutcome {
    /// Counted toward the given side.
    Recorded {
        challenge_id: ChallengeId,
        side: Side,
    },
    /// Ignored, with the reason.
    Skipped(SkipReason),
}

/// Count one gameplay event toward the hex's live contest, if any.
///
/// Atomically upserts the player's contribution row and increments the
/// matching side's score on the challenge.
pub fn record(
    conn: &mut Connection,
    roster: &dyn Roster,
    hex_id: HexId,
    username: &str,
    share_points: u64,
    now: u64,
) -> Result<ContributionOutcome> {
    let tx = conn.transaction().map_err(turf_db::DbError::Sqlite)?;

    let challenge_id = match territory::get(&tx, hex_id)?.and_then(|t| t.active_challenge_id) {
        Some(id) => id,
        None => return Ok(ContributionOutcome::Skipped(SkipReason::NoActiveChallenge)),
    };
    let ch = match challenge::get(&tx, challenge_id)? {
        Some(ch) if !ch.resolved => ch,
        _ => return Ok(ContributionOutcome::Skipped(SkipReason::NoActiveChallenge)),
    };
    if !ch.in_window(now) {
        return Ok(ContributionOutcome::Skipped(SkipReason::OutsideWindow));
    }

    let guild_id = match roster.guild_of(username) {
        Some(g) => g,
        None => return Ok(ContributionOutcome::Skipped(SkipReason::UnknownPlayer)),
    };
    let side = match ch.side_of(&guild_id) {
        Some(side) => side,
        None => return Ok(ContributionOutcome::Skipped(SkipReason::NotAContestant)),
    };

    contribution::upsert(&tx, challenge_id, username, share_points)?;
    if !challenge::add_score(&tx, challenge_id, side, share_points)? {
        // Resolved between the read and the update; drop the upsert too.
        return Ok(ContributionOutcome::Skipped(SkipReason::NoActiveChallenge));
    }

    tx.commit().map_err(turf_db::DbError::Sqlite)?;

    tracing::debug!(%hex_id, challenge_id, username, share_points, ?side, "contribution recorded");

    Ok(ContributionOutcome::Recorded { challenge_id, side })
}
