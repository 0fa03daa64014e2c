//! Resolving a contest: the exactly-once terminal transition.

use rusqlite::Connection;
use turf_db::queries::{challenge, territory, triggers};
use turf_types::territory::Challenge;
use turf_types::vault::TransactionReason;
use turf_types::{ChallengeId, TriggerKind, CONTROL_PERIOD_SECS};

use crate::{ChallengeError, Result};

/// Outcome of a resolution attempt. The no-op variants are successes:
/// delayed triggers deliver at least once, so duplicates are expected.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolutionOutcome {
    /// Attacker outscored the defender; control transferred.
    AttackerWon {
        challenge: Challenge,
        /// The defender's stake, credited to the attacker's vault.
        payout: u64,
    },
    /// Defender retained control (ties favor the incumbent).
    DefenderHeld {
        challenge: Challenge,
        /// The attacker's stake, credited to the defender's vault.
        payout: u64,
    },
    /// Someone already resolved this challenge.
    AlreadyResolved,
    /// The contest window has not closed yet.
    NotDue { ends_at: u64 },
}

/// Resolve a challenge whose window has closed.
///
/// Safe to invoke any number of times and from both the event-armed
/// trigger and the periodic sweep: the `resolved` flag flips under a
/// conditional update, and every later invocation reports
/// [`ResolutionOutcome::AlreadyResolved`] without touching state.
pub fn resolve(
    conn: &mut Connection,
    challenge_id: ChallengeId,
    now: u64,
) -> Result<ResolutionOutcome> {
    let tx = conn.transaction().map_err(turf_db::DbError::Sqlite)?;

    let ch = challenge::get(&tx, challenge_id)?
        .ok_or(ChallengeError::UnknownChallenge(challenge_id))?;
    if ch.resolved {
        return Ok(ResolutionOutcome::AlreadyResolved);
    }
    if ch.ends_at > now {
        return Ok(ResolutionOutcome::NotDue { ends_at: ch.ends_at });
    }

    // The one-way flip. Losing this race means another worker got here
    // first; everything below runs at most once per challenge.
    if !challenge::mark_resolved_if_due(&tx, challenge_id, now)? {
        return Ok(ResolutionOutcome::AlreadyResolved);
    }

    let control_ends_at = now + CONTROL_PERIOD_SECS;
    let attacker_won = ch.attacker_score > ch.defender_score;

    let (winner, payout) = if attacker_won {
        territory::transfer_control(
            &tx,
            ch.hex_id,
            &ch.attacker_guild_id,
            ch.attacker_stake,
            now,
            control_ends_at,
        )?;
        (ch.attacker_guild_id.as_str(), ch.defender_stake)
    } else {
        territory::confirm_control(&tx, ch.hex_id, control_ends_at)?;
        (ch.defender_guild_id.as_str(), ch.attacker_stake)
    };

    // The losing stake goes to the winner's vault.
    turf_vault::credit(
        &tx,
        winner,
        payout,
        TransactionReason::ChallengePayout {
            hex_id: ch.hex_id,
            challenge_id,
        },
        now,
    )?;

    // Retire this trigger and restart the expiry clock for the winner.
    triggers::mark_fired(&tx, TriggerKind::ChallengeResolution, challenge_id, now)?;
    triggers::arm(
        &tx,
        TriggerKind::TerritoryExpiry,
        ch.hex_id.as_i64(),
        control_ends_at,
        now,
    )?;

    tx.commit().map_err(turf_db::DbError::Sqlite)?;

    tracing::info!(
        hex_id = %ch.hex_id,
        challenge_id,
        winner,
        attacker_won,
        attacker_score = ch.attacker_score,
        defender_score = ch.defender_score,
        payout,
        "challenge resolved"
    );

    let resolved = Challenge {
        resolved: true,
        ..ch
    };
    Ok(if attacker_won {
        ResolutionOutcome::AttackerWon {
            challenge: resolved,
            payout,
        }
    } else {
        ResolutionOutcome::DefenderHeld {
            challenge: resolved,
            payout,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_types::roster::StaticRoster;
    use turf_types::HexId;

    fn hex() -> HexId {
        turf_geo::cell_at(0.04, 0.04)
    }

    fn contested_db() -> (Connection, ChallengeId, u64) {
        let mut conn = turf_db::open_memory().expect("open");
        for guild in ["defender", "attacker"] {
            turf_vault::open_vault(&conn, guild, 0).expect("vault");
            turf_vault::credit(
                &conn,
                guild,
                10_000,
                TransactionReason::Deposit { memo: "seed".into() },
                0,
            )
            .expect("fund");
        }
        turf_territory::stake::claim(&mut conn, hex(), "defender", 500, 100).expect("claim");
        let c = crate::admission::open(&mut conn, hex(), "attacker", 500, 200).expect("open");
        (conn, c.id, c.ends_at)
    }

    fn score(conn: &mut Connection, username: &str, points: u64) {
        let roster = StaticRoster::default()
            .with_member("dana", "defender", false)
            .with_member("alex", "attacker", false);
        let out = crate::contribution::record(conn, &roster, hex(), username, points, 300)
            .expect("record");
        assert!(matches!(
            out,
            crate::contribution::ContributionOutcome::Recorded { .. }
        ));
    }

    #[test]
    fn test_attacker_wins_and_takes_control() {
        let (mut conn, id, ends_at) = contested_db();
        score(&mut conn, "alex", 300);
        score(&mut conn, "dana", 200);

        let out = resolve(&mut conn, id, ends_at).expect("resolve");
        match out {
            ResolutionOutcome::AttackerWon { payout, .. } => assert_eq!(payout, 500),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let t = turf_db::queries::territory::get(&conn, hex())
            .expect("get")
            .expect("exists");
        assert_eq!(t.controlling_guild_id.as_deref(), Some("attacker"));
        assert_eq!(t.current_stake, 500);
        assert_eq!(t.active_challenge_id, None);
        assert_eq!(t.control_ends_at, Some(ends_at + CONTROL_PERIOD_SECS));

        // Winner receives the defender's stake: 10_000 - 500 staked + 500 payout.
        assert_eq!(
            turf_vault::balance(&conn, "attacker").expect("balance"),
            10_000
        );
        // Defender's stake is gone with the territory.
        assert_eq!(
            turf_vault::balance(&conn, "defender").expect("balance"),
            9_500
        );
    }

    #[test]
    fn test_defender_holds_on_tie() {
        let (mut conn, id, ends_at) = contested_db();
        score(&mut conn, "alex", 200);
        score(&mut conn, "dana", 200);

        let out = resolve(&mut conn, id, ends_at).expect("resolve");
        match out {
            ResolutionOutcome::DefenderHeld { payout, .. } => assert_eq!(payout, 500),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let t = turf_db::queries::territory::get(&conn, hex())
            .expect("get")
            .expect("exists");
        assert_eq!(t.controlling_guild_id.as_deref(), Some("defender"));
        assert_eq!(t.current_stake, 500);
        assert_eq!(t.active_challenge_id, None);
        assert_eq!(t.control_ends_at, Some(ends_at + CONTROL_PERIOD_SECS));

        // Defender keeps their stake in place and gains the attacker's.
        assert_eq!(
            turf_vault::balance(&conn, "defender").expect("balance"),
            10_000
        );
        assert_eq!(
            turf_vault::balance(&conn, "attacker").expect("balance"),
            9_500
        );
    }

    #[test]
    fn test_resolution_idempotent() {
        let (mut conn, id, ends_at) = contested_db();
        score(&mut conn, "alex", 300);

        resolve(&mut conn, id, ends_at).expect("first");
        let attacker_after = turf_vault::balance(&conn, "attacker").expect("balance");
        let t_after = turf_db::queries::territory::get(&conn, hex())
            .expect("get")
            .expect("exists");

        let out = resolve(&mut conn, id, ends_at + 100).expect("second");
        assert_eq!(out, ResolutionOutcome::AlreadyResolved);

        // Identical state after the duplicate invocation.
        assert_eq!(
            turf_vault::balance(&conn, "attacker").expect("balance"),
            attacker_after
        );
        let t_again = turf_db::queries::territory::get(&conn, hex())
            .expect("get")
            .expect("exists");
        assert_eq!(t_again.controlling_guild_id, t_after.controlling_guild_id);
        assert_eq!(t_again.control_ends_at, t_after.control_ends_at);
    }

    #[test]
    fn test_early_fire_is_noop() {
        let (mut conn, id, ends_at) = contested_db();

        let out = resolve(&mut conn, id, ends_at - 1).expect("early");
        assert_eq!(out, ResolutionOutcome::NotDue { ends_at });

        let ch = challenge::get(&conn, id).expect("get").expect("exists");
        assert!(!ch.resolved);
    }

    #[test]
    fn test_unknown_challenge() {
        let mut conn = turf_db::open_memory().expect("open");
        let err = resolve(&mut conn, 404, 1_000).expect_err("unknown");
        assert!(matches!(err, ChallengeError::UnknownChallenge(404)));
    }

    #[test]
    fn test_resolution_rearms_expiry_for_winner() {
        let (mut conn, id, ends_at) = contested_db();
        score(&mut conn, "alex", 300);
        resolve(&mut conn, id, ends_at).expect("resolve");

        let pending = triggers::pending(&conn).expect("pending");
        assert!(pending.iter().any(|p| p.kind == TriggerKind::TerritoryExpiry
            && p.target_id == hex().as_i64()
            && p.fire_at == ends_at + CONTROL_PERIOD_SECS));
        // Resolution trigger retired.
        assert!(!pending
            .iter()
            .any(|p| p.kind == TriggerKind::ChallengeResolution));
    }

    #[test]
    fn test_zero_score_contest_defender_holds() {
        let (mut conn, id, ends_at) = contested_db();
        let out = resolve(&mut conn, id, ends_at).expect("resolve");
        assert!(matches!(out, ResolutionOutcome::DefenderHeld { .. }));
    }
}
