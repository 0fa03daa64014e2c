//! # turf-vault
//!
//! Guild vault ledger: the shared currency pool a guild stakes from.
//!
//! Every balance mutation appends one audit row capturing
//! `balance_before`/`balance_after` under the same SQLite transaction as
//! the mutation itself, so replaying a guild's transactions reconstructs
//! its balance exactly and a failure partway leaves neither change
//! applied.
//!
//! [`debit`] and [`credit`] assume the caller already holds a
//! transaction: the admission services (claim, challenge, resolution)
//! each run one transaction spanning the balance mutation and their own
//! state changes. Standalone callers open one around the single call.

use rusqlite::Connection;
use turf_types::vault::{TransactionReason, TxType, VaultTransaction};

/// Error types for vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The guild has no vault.
    #[error("unknown guild vault: {0}")]
    UnknownGuild(String),

    /// The vault holds less than the requested debit.
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: u64, available: u64 },

    /// Credit would overflow the balance column.
    #[error("balance overflow")]
    Overflow,

    /// Replaying the ledger does not reproduce the stored balances.
    #[error("ledger drift for {guild_id} at transaction {tx_id}")]
    LedgerDrift { guild_id: String, tx_id: i64 },

    #[error(transparent)]
    Db(#[from] turf_db::DbError),
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// Create a zero-balance vault for a guild if it has none. Idempotent.
pub fn open_vault(conn: &Connection, guild_id: &str, now: u64) -> Result<()> {
    turf_db::queries::vault::ensure(conn, guild_id, now)?;
    Ok(())
}

/// Current balance of a guild's vault.
pub fn balance(conn: &Connection, guild_id: &str) -> Result<u64> {
    turf_db::queries::vault::balance(conn, guild_id)?
        .ok_or_else(|| VaultError::UnknownGuild(guild_id.to_string()))
}

/// Atomically remove `amount` from the vault and append the audit row.
///
/// The floor check and the decrement are a single guarded statement, so
/// concurrent debits by the same guild cannot overdraw.
pub fn debit(
    conn: &Connection,
    guild_id: &str,
    amount: u64,
    reason: TransactionReason,
    now: u64,
) -> Result<VaultTransaction> {
    let before = balance(conn, guild_id)?;
    if !turf_db::queries::vault::debit_balance(conn, guild_id, amount, now)? {
        return Err(VaultError::InsufficientBalance {
            required: amount,
            available: before,
        });
    }
    let after = balance(conn, guild_id)?;
    let id = turf_db::queries::vault::append_transaction(
        conn,
        guild_id,
        TxType::Debit,
        amount,
        before,
        after,
        &reason,
        now,
    )?;

    tracing::debug!(guild_id, amount, after, reason = reason.label(), "vault debit");

    Ok(VaultTransaction {
        id,
        guild_id: guild_id.to_string(),
        tx_type: TxType::Debit,
        amount,
        balance_before: before,
        balance_after: after,
        reason,
        created_at: now,
    })
}

/// Atomically add `amount` to the vault and append the audit row.
pub fn credit(
    conn: &Connection,
    guild_id: &str,
    amount: u64,
    reason: TransactionReason,
    now: u64,
) -> Result<VaultTransaction> {
    let before = balance(conn, guild_id)?;
    before.checked_add(amount).ok_or(VaultError::Overflow)?;
    if !turf_db::queries::vault::credit_balance(conn, guild_id, amount, now)? {
        return Err(VaultError::UnknownGuild(guild_id.to_string()));
    }
    let after = balance(conn, guild_id)?;
    let id = turf_db::queries::vault::append_transaction(
        conn,
        guild_id,
        TxType::Credit,
        amount,
        before,
        after,
        &reason,
        now,
    )?;

    tracing::debug!(guild_id, amount, after, reason = reason.label(), "vault credit");

    Ok(VaultTransaction {
        id,
        guild_id: guild_id.to_string(),
        tx_type: TxType::Credit,
        amount,
        balance_before: before,
        balance_after: after,
        reason,
        created_at: now,
    })
}

/// A guild's ledger, oldest first.
pub fn history(conn: &Connection, guild_id: &str, limit: u32) -> Result<Vec<VaultTransaction>> {
    Ok(turf_db::queries::vault::history(conn, guild_id, limit)?)
}

/// Replay a guild's ledger and return the reconstructed balance.
///
/// Audit check: the result must equal [`balance`]. Also verifies each
/// row's internal `before ± amount = after` arithmetic.
pub fn replay(conn: &Connection, guild_id: &str) -> Result<u64> {
    let txs = history(conn, guild_id, u32::MAX)?;
    let mut running: u64 = 0;
    for tx in &txs {
        let expected = match tx.tx_type {
            TxType::Credit => tx.balance_before.checked_add(tx.amount),
            TxType::Debit => tx.balance_before.checked_sub(tx.amount),
        };
        if expected != Some(tx.balance_after) || tx.balance_before != running {
            return Err(VaultError::LedgerDrift {
                guild_id: guild_id.to_string(),
                tx_id: tx.id,
            });
        }
        running = tx.balance_after;
    }
    Ok(running)
}
