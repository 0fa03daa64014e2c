//! Vault command handlers.

use std::sync::Arc;

use serde_json::Value;
use turf_scheduler::unix_now;
use turf_types::vault::TransactionReason;
use turf_vault::VaultError;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn str_param<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Current vault balance for a guild.
pub async fn get_vault_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let guild_id = str_param(params, "guild_id")?;

    let db = state.db.lock().await;
    match turf_vault::balance(&db, guild_id) {
        Ok(balance) => Ok(serde_json::json!({"guild_id": guild_id, "balance": balance})),
        Err(VaultError::UnknownGuild(g)) => Err(RpcError::not_found(&format!("guild vault {g}"))),
        Err(e) => Err(RpcError::internal_error(&e.to_string())),
    }
}

/// A guild's ledger, oldest first.
pub async fn get_vault_history(state: &Arc<DaemonState>, params: &Value) -> Result {
    let guild_id = str_param(params, "guild_id")?;
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(100)
        .min(1_000) as u32;

    let db = state.db.lock().await;
    let txs = turf_vault::history(&db, guild_id, limit)
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;

    let result: Vec<Value> = txs
        .iter()
        .map(|tx| {
            serde_json::json!({
                "id": tx.id,
                "tx_type": tx.tx_type.as_str(),
                "amount": tx.amount,
                "balance_before": tx.balance_before,
                "balance_after": tx.balance_after,
                "reason": tx.reason,
                "created_at": tx.created_at,
            })
        })
        .collect();

    Ok(serde_json::json!(result))
}

/// Credit settled currency into a guild's vault.
///
/// Settlement with the payment network happens upstream; by the time this
/// arrives the amount is final.
pub async fn deposit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let guild_id = str_param(params, "guild_id")?;
    let amount = params
        .get("amount")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("amount required"))?;
    if amount == 0 {
        return Err(RpcError::invalid_params("amount must be non-zero"));
    }
    let memo = params
        .get("memo")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let now = unix_now();
    let mut db = state.db.lock().await;
    let tx = db
        .transaction()
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    turf_vault::open_vault(&tx, guild_id, now)
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    let receipt = turf_vault::credit(
        &tx,
        guild_id,
        amount,
        TransactionReason::Deposit { memo },
        now,
    )
    .map_err(|e| RpcError::internal_error(&e.to_string()))?;
    tx.commit()
        .map_err(|e| RpcError::internal_error(&e.to_string()))?;

    Ok(serde_json::json!({
        "guild_id": guild_id,
        "balance": receipt.balance_after,
        "transaction_id": receipt.id,
    }))
}
