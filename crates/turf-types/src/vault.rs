//! Guild vault transaction records.
//!
//! Every balance mutation appends one [`VaultTransaction`] row capturing the
//! balance before and after, so replaying a guild's transactions
//! reconstructs its current balance exactly.

use serde::{Deserialize, Serialize};

use crate::{ChallengeId, GuildId, HexId};

/// Direction of a balance mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Debit,
    Credit,
}

impl TxType {
    /// Stable string form stored in the `tx_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            TxType::Debit => "debit",
            TxType::Credit => "credit",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debit" => Some(TxType::Debit),
            "credit" => Some(TxType::Credit),
            _ => None,
        }
    }
}

/// Why a vault balance changed. One variant per reason, each carrying only
/// the fields relevant to that reason; serialized as JSON in the `reason`
/// column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionReason {
    /// Stake debited to claim an uncontrolled hex.
    TerritoryStake { hex_id: HexId },
    /// Stake debited to open a challenge against a controlled hex.
    ChallengeStake { hex_id: HexId, challenge_id: ChallengeId },
    /// The losing side's stake, credited to the winner on resolution.
    ChallengePayout { hex_id: HexId, challenge_id: ChallengeId },
    /// Settled in-guild currency arriving from the payment network.
    Deposit { memo: String },
}

impl TransactionReason {
    /// Human-readable label used in logs and history listings.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionReason::TerritoryStake { .. } => "Territory Stake",
            TransactionReason::ChallengeStake { .. } => "Territory challenge stake",
            TransactionReason::ChallengePayout { .. } => "Territory challenge payout",
            TransactionReason::Deposit { .. } => "Deposit",
        }
    }
}

/// One append-only ledger row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultTransaction {
    pub id: i64,
    pub guild_id: GuildId,
    pub tx_type: TxType,
    pub amount: u64,
    pub balance_before: u64,
    pub balance_after: u64,
    pub reason: TransactionReason,
    pub created_at: u64,
}
