//! Mirror-sync command handlers.
//!
//! Membership and the node catalog are owned by external services; these
//! commands are their push endpoints into the daemon's local mirrors.

use std::sync::Arc;

use serde_json::Value;
use turf_scheduler::unix_now;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn str_param<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

fn f64_param(params: &Value, key: &str) -> std::result::Result<f64, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Apply a membership change from the guild service.
pub async fn sync_member(state: &Arc<DaemonState>, params: &Value) -> Result {
    let username = str_param(params, "username")?;
    let guild_id = str_param(params, "guild_id")?;
    let is_officer = params
        .get("is_officer")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    state
        .roster
        .put_member(username, guild_id, is_officer, unix_now())
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;

    Ok(serde_json::json!({"username": username, "guild_id": guild_id}))
}

/// Apply a node record from the map pipeline.
pub async fn sync_node(state: &Arc<DaemonState>, params: &Value) -> Result {
    let node_id = str_param(params, "node_id")?;
    let name = str_param(params, "name")?;
    let lat = f64_param(params, "lat")?;
    let lon = f64_param(params, "lon")?;
    let traffic_score = params
        .get("traffic_score")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(RpcError::invalid_params("coordinates out of range"));
    }

    let db = state.db.lock().await;
    turf_db::queries::nodes::upsert(&db, node_id, name, lat, lon, traffic_score)
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;

    Ok(serde_json::json!({
        "node_id": node_id,
        "hex_id": turf_geo::cell_at(lat, lon).as_u64(),
    }))
}
