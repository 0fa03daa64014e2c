//! Guild vault queries.
//!
//! The balance column is the accessor's source of truth; the
//! `vault_transactions` log is append-only and reconstructs it exactly.
//! Callers wrap the balance mutation and the log insert in one
//! transaction (`turf-vault` owns that orchestration).

use rusqlite::{Connection, OptionalExtension};
use turf_types::vault::{TransactionReason, TxType, VaultTransaction};

use crate::{DbError, Result};

/// Create a zero-balance vault if the guild has none yet.
pub fn ensure(conn: &Connection, guild_id: &str, now: u64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO guild_vaults (guild_id, balance, created_at, updated_at)
         VALUES (?1, 0, ?2, ?2)",
        rusqlite::params![guild_id, now as i64],
    )?;
    Ok(())
}

/// Current balance, or None for an unknown guild.
pub fn balance(conn: &Connection, guild_id: &str) -> Result<Option<u64>> {
    let balance = conn
        .query_row(
            "SELECT balance FROM guild_vaults WHERE guild_id = ?1",
            [guild_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(balance.map(|b| b as u64))
}

/// Decrement the balance if sufficient funds exist. The floor check and
/// the mutation are one statement, so concurrent debits cannot overdraw.
pub fn debit_balance(conn: &Connection, guild_id: &str, amount: u64, now: u64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE guild_vaults SET balance = balance - ?2, updated_at = ?3
         WHERE guild_id = ?1 AND balance >= ?2",
        rusqlite::params![guild_id, amount as i64, now as i64],
    )?;
    Ok(changed == 1)
}

/// Increment the balance. Fails only for an unknown guild.
pub fn credit_balance(conn: &Connection, guild_id: &str, amount: u64, now: u64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE guild_vaults SET balance = balance + ?2, updated_at = ?3
         WHERE guild_id = ?1",
        rusqlite::params![guild_id, amount as i64, now as i64],
    )?;
    Ok(changed == 1)
}

/// Append one ledger row. Returns the row id.
#[allow(clippy::too_many_arguments)]
pub fn append_transaction(
    conn: &Connection,
    guild_id: &str,
    tx_type: TxType,
    amount: u64,
    balance_before: u64,
    balance_after: u64,
    reason: &TransactionReason,
    now: u64,
) -> Result<i64> {
    let reason_json = serde_json::to_string(reason)
        .map_err(|e| DbError::Serialization(format!("transaction reason: {e}")))?;
    conn.execute(
        "INSERT INTO vault_transactions
             (guild_id, tx_type, amount, balance_before, balance_after, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            guild_id,
            tx_type.as_str(),
            amount as i64,
            balance_before as i64,
            balance_after as i64,
            reason_json,
            now as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A guild's ledger, oldest first.
pub fn history(conn: &Connection, guild_id: &str, limit: u32) -> Result<Vec<VaultTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, guild_id, tx_type, amount, balance_before, balance_after, reason, created_at
         FROM vault_transactions WHERE guild_id = ?1 ORDER BY id LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![guild_id, limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, guild_id, tx_type, amount, before, after, reason, created_at)| {
            let tx_type = TxType::parse(&tx_type)
                .ok_or_else(|| DbError::Serialization(format!("unknown tx_type: {tx_type}")))?;
            let reason: TransactionReason = serde_json::from_str(&reason)
                .map_err(|e| DbError::Serialization(format!("transaction reason: {e}")))?;
            Ok(VaultTransaction {
                id,
                guild_id,
                tx_type,
                amount: amount as u64,
                balance_before: before as u64,
                balance_after: after as u64,
                reason,
                created_at: created_at as u64,
            })
        })
        .collect()
}
