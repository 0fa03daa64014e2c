//! Territory & challenge command handlers.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;
use turf_challenge::contribution::ContributionOutcome;
use turf_challenge::ChallengeError;
use turf_scheduler::unix_now;
use turf_territory::TerritoryError;
use turf_types::territory::{Challenge, Side, Territory};
use turf_types::HexId;
use turf_types::Roster;
use turf_vault::VaultError;

use crate::events::Event;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn hex_param(params: &Value) -> std::result::Result<HexId, RpcError> {
    params
        .get("hex_id")
        .and_then(|v| v.as_u64())
        .map(HexId)
        .ok_or_else(|| RpcError::invalid_params("hex_id required"))
}

fn str_param<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

fn u64_param(params: &Value, key: &str) -> std::result::Result<u64, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

fn vault_error(e: &VaultError) -> RpcError {
    match e {
        VaultError::InsufficientBalance {
            required,
            available,
        } => RpcError::insufficient_balance(*required, *available),
        VaultError::UnknownGuild(g) => RpcError::not_found(&format!("guild vault {g}")),
        other => RpcError::internal_error(&other.to_string()),
    }
}

fn territory_error(e: &TerritoryError) -> RpcError {
    match e {
        TerritoryError::Validation(detail) => RpcError::validation(detail),
        TerritoryError::InsufficientStake { required } => RpcError::insufficient_stake(*required),
        TerritoryError::AlreadyControlled(_) => RpcError::already_controlled(),
        TerritoryError::Vault(v) => vault_error(v),
        TerritoryError::Db(d) => RpcError::internal_error(&d.to_string()),
    }
}

fn challenge_error(e: &ChallengeError) -> RpcError {
    match e {
        ChallengeError::Validation(detail) => RpcError::validation(detail),
        ChallengeError::NotFound(hex) => RpcError::not_found(&hex.to_string()),
        ChallengeError::NotControlled(_) => RpcError::not_controlled(),
        ChallengeError::SelfChallenge => RpcError::self_challenge(),
        ChallengeError::ChallengeAlreadyActive(_) => RpcError::challenge_already_active(),
        ChallengeError::InsufficientStake { required } => RpcError::insufficient_stake(*required),
        ChallengeError::UnknownChallenge(id) => RpcError::not_found(&format!("challenge {id}")),
        ChallengeError::Vault(v) => vault_error(v),
        ChallengeError::Db(d) => RpcError::internal_error(&d.to_string()),
        ChallengeError::Territory(t) => territory_error(t),
    }
}

fn territory_json(t: &Territory) -> Value {
    serde_json::json!({
        "hex_id": t.hex_id.as_u64(),
        "controlling_guild_id": t.controlling_guild_id,
        "current_stake": t.current_stake,
        "controlled_at": t.controlled_at,
        "control_ends_at": t.control_ends_at,
        "active_challenge_id": t.active_challenge_id,
        "center_lat": t.center_lat,
        "center_lon": t.center_lon,
    })
}

fn challenge_json(c: &Challenge) -> Value {
    serde_json::json!({
        "id": c.id,
        "hex_id": c.hex_id.as_u64(),
        "defender_guild_id": c.defender_guild_id,
        "defender_stake": c.defender_stake,
        "attacker_guild_id": c.attacker_guild_id,
        "attacker_stake": c.attacker_stake,
        "starts_at": c.starts_at,
        "ends_at": c.ends_at,
        "resolved": c.resolved,
        "defender_score": c.defender_score,
        "attacker_score": c.attacker_score,
    })
}

/// Claim an uncontrolled hex for the caller's guild.
pub async fn claim_territory(state: &Arc<DaemonState>, params: &Value) -> Result {
    let hex_id = hex_param(params)?;
    let guild_id = str_param(params, "guild_id")?;
    let username = str_param(params, "username")?;
    let stake = u64_param(params, "stake")?;

    if !state.roster.is_officer(username, guild_id) {
        return Err(RpcError::unauthorized(username, guild_id));
    }

    let now = unix_now();
    let territory = {
        let mut db = state.db.lock().await;
        turf_territory::stake::claim(&mut db, hex_id, guild_id, stake, now)
            .map_err(|e| territory_error(&e))?
    };

    // The trigger row is already durable; this just shortens the nap.
    state.scheduler.notify();
    state.event_bus.emit(Event {
        event_type: "TerritoryClaimed".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "hex_id": hex_id.as_u64(),
            "guild_id": guild_id,
            "control_ends_at": territory.control_ends_at,
        }),
    });

    Ok(territory_json(&territory))
}

/// Open a challenge against a controlled hex.
pub async fn challenge_territory(state: &Arc<DaemonState>, params: &Value) -> Result {
    let hex_id = hex_param(params)?;
    let guild_id = str_param(params, "guild_id")?;
    let username = str_param(params, "username")?;
    let stake = u64_param(params, "stake")?;

    if !state.roster.is_officer(username, guild_id) {
        return Err(RpcError::unauthorized(username, guild_id));
    }

    let now = unix_now();
    let challenge = {
        let mut db = state.db.lock().await;
        turf_challenge::admission::open(&mut db, hex_id, guild_id, stake, now)
            .map_err(|e| challenge_error(&e))?
    };

    state.scheduler.notify();
    state.event_bus.emit(Event {
        event_type: "ChallengeStarted".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "challenge_id": challenge.id,
            "hex_id": hex_id.as_u64(),
            "ends_at": challenge.ends_at,
        }),
    });

    Ok(challenge_json(&challenge))
}

/// Territory detail: controller, stake, window, active challenge.
pub async fn get_territory(state: &Arc<DaemonState>, params: &Value) -> Result {
    let hex_id = hex_param(params)?;

    let db = state.db.lock().await;
    let territory = turf_db::queries::territory::get(&db, hex_id)
        .map_err(|e| RpcError::internal_error(&e.to_string()))?
        .ok_or_else(|| RpcError::not_found(&hex_id.to_string()))?;

    let challenge = match territory.active_challenge_id {
        Some(id) => turf_db::queries::challenge::get(&db, id)
            .map_err(|e| RpcError::internal_error(&e.to_string()))?,
        None => None,
    };

    let mut result = territory_json(&territory);
    result["active_challenge"] = match challenge {
        Some(ref c) => challenge_json(c),
        None => Value::Null,
    };
    Ok(result)
}

/// All territories currently under control.
pub async fn list_territories(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let territories = turf_db::queries::territory::list_controlled(&db)
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    Ok(Value::Array(territories.iter().map(territory_json).collect()))
}

/// Count a gameplay event toward the hex's live contest, if any.
///
/// Best-effort by contract: contribution tracking must never fail the
/// gameplay action that produced it, so every failure path degrades to
/// `recorded: false` after logging.
pub async fn record_contribution(state: &Arc<DaemonState>, params: &Value) -> Result {
    let hex_id = hex_param(params)?;
    let username = str_param(params, "username")?;
    let share_points = u64_param(params, "share_points")?;

    let now = unix_now();
    let outcome = {
        let mut db = state.db.lock().await;
        turf_challenge::contribution::record(
            &mut db,
            state.roster.as_ref(),
            hex_id,
            username,
            share_points,
            now,
        )
    };

    match outcome {
        Ok(ContributionOutcome::Recorded { challenge_id, side }) => Ok(serde_json::json!({
            "recorded": true,
            "challenge_id": challenge_id,
            "side": match side {
                Side::Defender => "defender",
                Side::Attacker => "attacker",
            },
        })),
        Ok(ContributionOutcome::Skipped(reason)) => Ok(serde_json::json!({
            "recorded": false,
            "reason": reason.as_str(),
        })),
        Err(e) => {
            warn!(%hex_id, username, error = %e, "contribution recording failed");
            Ok(serde_json::json!({
                "recorded": false,
                "reason": "internal error",
            }))
        }
    }
}
