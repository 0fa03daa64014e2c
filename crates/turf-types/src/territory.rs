//! Territory, challenge, and contribution records.

use serde::{Deserialize, Serialize};

use crate::{ChallengeId, GuildId, HexId, Username};

/// Control state of one hex cell. One row per hex that has ever been
/// claimed; reverting to uncontrolled nulls the fields, never deletes
/// the row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Territory {
    /// The hex this row controls.
    pub hex_id: HexId,
    /// Owning guild; `None` means uncontrolled.
    pub controlling_guild_id: Option<GuildId>,
    /// The controller's at-risk stake.
    pub current_stake: u64,
    /// When control began.
    pub controlled_at: Option<u64>,
    /// When control lapses unless defended or re-staked.
    pub control_ends_at: Option<u64>,
    /// At most one live challenge per territory.
    pub active_challenge_id: Option<ChallengeId>,
    /// Cached centroid for map display (derived from `hex_id`).
    pub center_lat: f64,
    /// Cached centroid for map display (derived from `hex_id`).
    pub center_lon: f64,
}

impl Territory {
    /// Whether any guild currently controls this hex.
    pub fn is_controlled(&self) -> bool {
        self.controlling_guild_id.is_some()
    }
}

/// One contest over a controlled hex.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub hex_id: HexId,
    pub defender_guild_id: GuildId,
    pub defender_stake: u64,
    pub attacker_guild_id: GuildId,
    pub attacker_stake: u64,
    pub starts_at: u64,
    pub ends_at: u64,
    /// Transitions false -> true exactly once; never reverts.
    pub resolved: bool,
    pub defender_score: u64,
    pub attacker_score: u64,
}

impl Challenge {
    /// Whether `now` falls inside the scoring window `[starts_at, ends_at)`.
    pub fn in_window(&self, now: u64) -> bool {
        now >= self.starts_at && now < self.ends_at
    }

    /// Which side a contributing guild fights for, if either.
    pub fn side_of(&self, guild_id: &str) -> Option<Side> {
        if guild_id == self.defender_guild_id {
            Some(Side::Defender)
        } else if guild_id == self.attacker_guild_id {
            Some(Side::Attacker)
        } else {
            None
        }
    }
}

/// The two sides of a contest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Defender,
    Attacker,
}

/// Accumulated contribution of one player to one contest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contribution {
    pub challenge_id: ChallengeId,
    pub username: Username,
    /// Cumulative score contributed.
    pub share_points: u64,
    /// Number of contributing actions.
    pub tune_count: u64,
}
