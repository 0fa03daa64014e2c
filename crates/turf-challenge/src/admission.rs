//! Opening a challenge against a controlled hex.

use rusqlite::Connection;
use turf_db::queries::{challenge, nodes, territory, triggers};
use turf_territory::index;
use turf_types::territory::Challenge;
use turf_types::vault::TransactionReason;
use turf_types::{HexId, TriggerKind, CONTEST_BUFFER_SECS, CONTEST_WINDOW_SECS};

use crate::{ChallengeError, Result};

/// Open a contest against a controlled hex.
///
/// One transaction spans the node linking, the attacker's stake debit,
/// the challenge insert, the territory lock, and the resolution-trigger
/// arm. The lock (`active_challenge_id` set only `WHERE
/// active_challenge_id IS NULL`) serializes concurrent challengers:
/// the loser's whole transaction rolls back.
pub fn open(
    conn: &mut Connection,
    hex_id: HexId,
    attacker_guild_id: &str,
    stake: u64,
    now: u64,
) -> Result<Challenge> {
    if attacker_guild_id.is_empty() {
        return Err(ChallengeError::Validation("guild id is empty".into()));
    }

    let tx = conn.transaction().map_err(turf_db::DbError::Sqlite)?;

    let t = territory::get(&tx, hex_id)?.ok_or(ChallengeError::NotFound(hex_id))?;
    let defender_guild_id = t
        .controlling_guild_id
        .clone()
        .ok_or(ChallengeError::NotControlled(hex_id))?;

    if attacker_guild_id == defender_guild_id {
        return Err(ChallengeError::SelfChallenge);
    }
    if let Some(active) = t.active_challenge_id {
        return Err(ChallengeError::ChallengeAlreadyActive(active));
    }
    if stake < t.current_stake {
        return Err(ChallengeError::InsufficientStake {
            required: t.current_stake,
        });
    }

    // Materialize the contest's scope before scoring starts: any member
    // node still unlinked joins the hex now.
    for node in index::nodes_in_hex(&tx, hex_id)? {
        nodes::link_if_unlinked(&tx, &node.node_id, hex_id)?;
    }

    let starts_at = now;
    let ends_at = now + CONTEST_WINDOW_SECS;
    let challenge_id = challenge::insert(
        &tx,
        hex_id,
        &defender_guild_id,
        t.current_stake,
        attacker_guild_id,
        stake,
        starts_at,
        ends_at,
    )?;

    turf_vault::debit(
        &tx,
        attacker_guild_id,
        stake,
        TransactionReason::ChallengeStake {
            hex_id,
            challenge_id,
        },
        now,
    )?;

    // The buffer keeps the territory from expiring mid-contest.
    if !territory::set_active_challenge(&tx, hex_id, challenge_id, ends_at + CONTEST_BUFFER_SECS)? {
        // Lost a race with another challenger after the read above.
        return Err(ChallengeError::ChallengeAlreadyActive(challenge_id));
    }

    triggers::arm(
        &tx,
        TriggerKind::ChallengeResolution,
        challenge_id,
        ends_at,
        now,
    )?;

    tx.commit().map_err(turf_db::DbError::Sqlite)?;

    tracing::info!(
        %hex_id,
        challenge_id,
        attacker_guild_id,
        defender_guild_id,
        stake,
        ends_at,
        "challenge opened"
    );

    Ok(Challenge {
        id: challenge_id,
        hex_id,
        defender_guild_id,
        defender_stake: t.current_stake,
        attacker_guild_id: attacker_guild_id.to_string(),
        attacker_stake: stake,
        starts_at,
        ends_at,
        resolved: false,
        defender_score: 0,
        attacker_score: 0,
    })
}
