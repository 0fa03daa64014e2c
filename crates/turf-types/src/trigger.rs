//! Durable delayed-trigger vocabulary.

use serde::{Deserialize, Serialize};

/// The two kinds of delayed execution this core arms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Clear an unchallenged territory when its control window lapses.
    /// `target_id` is the hex id.
    TerritoryExpiry,
    /// Resolve a contest when its scoring window closes.
    /// `target_id` is the challenge id.
    ChallengeResolution,
}

impl TriggerKind {
    /// Stable string form stored in the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::TerritoryExpiry => "territory_expiry",
            TriggerKind::ChallengeResolution => "challenge_resolution",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "territory_expiry" => Some(TriggerKind::TerritoryExpiry),
            "challenge_resolution" => Some(TriggerKind::ChallengeResolution),
            _ => None,
        }
    }
}
