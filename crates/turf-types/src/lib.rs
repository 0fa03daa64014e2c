//! # turf-types
//!
//! Shared domain types used across the Turf workspace: identifiers, game
//! constants, territory/challenge/vault records, and the [`Roster`] trait
//! abstracting the external membership service.

pub mod hex;
pub mod roster;
pub mod territory;
pub mod trigger;
pub mod vault;

pub use hex::HexId;
pub use roster::Roster;
pub use trigger::TriggerKind;

/// Guild identifier (opaque, assigned by the guild service).
pub type GuildId = String;

/// Player username (opaque, assigned by the account service).
pub type Username = String;

/// Point-of-interest (node) identifier.
pub type NodeId = String;

/// Challenge row identifier.
pub type ChallengeId = i64;

/// How long a successful claim holds a hex before it expires (14 days).
pub const CONTROL_PERIOD_SECS: u64 = 14 * 24 * 3600;

/// Duration of a contribution contest after a challenge opens (24 hours).
pub const CONTEST_WINDOW_SECS: u64 = 24 * 3600;

/// Extra control-window headroom past a contest's end, so a contested hex
/// cannot expire before its challenge resolves (6 hours).
pub const CONTEST_BUFFER_SECS: u64 = 6 * 3600;

/// Default interval of the safety-net sweep (daily, epoch-aligned).
pub const SWEEP_INTERVAL_SECS: u64 = 24 * 3600;

/// Minimum stake to claim a hex with zero traffic.
pub const BASE_MIN_STAKE: u64 = 100;

/// Additional minimum stake per point of hex traffic.
pub const MIN_STAKE_PER_TRAFFIC: u64 = 10;

/// Minimum stake required to claim a hex with the given traffic score.
///
/// Saturates rather than overflows for absurd traffic values.
pub fn min_stake(traffic_score: u64) -> u64 {
    BASE_MIN_STAKE.saturating_add(MIN_STAKE_PER_TRAFFIC.saturating_mul(traffic_score))
}
