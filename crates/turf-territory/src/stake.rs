//! Claiming an uncontrolled hex.

use rusqlite::Connection;
use turf_db::queries::{nodes, territory, triggers};
use turf_types::territory::Territory;
use turf_types::vault::TransactionReason;
use turf_types::{min_stake, HexId, TriggerKind, CONTROL_PERIOD_SECS};

use crate::{index, Result, TerritoryError};

/// Claim an uncontrolled hex for a guild.
///
/// One transaction spans the stake debit, the territory upsert, the node
/// reassignment, and the expiry-trigger arm; a failure partway leaves no
/// trace. Two simultaneous claims on the same hex resolve to exactly one
/// winner: the territory upsert is guarded by
/// `controlling_guild_id IS NULL`, so the loser gets
/// [`TerritoryError::AlreadyControlled`].
pub fn claim(
    conn: &mut Connection,
    hex_id: HexId,
    guild_id: &str,
    stake: u64,
    now: u64,
) -> Result<Territory> {
    if !turf_geo::is_valid(hex_id) {
        return Err(TerritoryError::Validation(format!(
            "{hex_id} is not on the map"
        )));
    }
    if guild_id.is_empty() {
        return Err(TerritoryError::Validation("guild id is empty".into()));
    }

    let tx = conn.transaction().map_err(turf_db::DbError::Sqlite)?;

    let required = min_stake(index::traffic_in_hex(&tx, hex_id)?);
    if stake < required {
        return Err(TerritoryError::InsufficientStake { required });
    }

    let control_ends_at = now + CONTROL_PERIOD_SECS;
    let center = turf_geo::center(hex_id);
    if !territory::claim_if_uncontrolled(
        &tx,
        hex_id,
        guild_id,
        stake,
        now,
        control_ends_at,
        center.lat,
        center.lon,
    )? {
        return Err(TerritoryError::AlreadyControlled(hex_id));
    }

    turf_vault::debit(
        &tx,
        guild_id,
        stake,
        TransactionReason::TerritoryStake { hex_id },
        now,
    )?;

    // Annex member nodes, leaving ones already linked elsewhere alone.
    let mut annexed = 0usize;
    for node in index::nodes_in_hex(&tx, hex_id)? {
        if nodes::link_if_unlinked(&tx, &node.node_id, hex_id)? {
            annexed += 1;
        }
    }

    triggers::arm(
        &tx,
        TriggerKind::TerritoryExpiry,
        hex_id.as_i64(),
        control_ends_at,
        now,
    )?;

    tx.commit().map_err(turf_db::DbError::Sqlite)?;

    tracing::info!(%hex_id, guild_id, stake, annexed, control_ends_at, "territory claimed");

    Ok(Territory {
        hex_id,
        controlling_guild_id: Some(guild_id.to_string()),
        current_stake: stake,
        controlled_at: Some(now),
        control_ends_at: Some(control_ends_at),
        active_challenge_id: None,
        center_lat: center.lat,
        center_lon: center.lon,
    })
}
