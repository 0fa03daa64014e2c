//! # turf-challenge
//!
//! Contests over controlled hexes.
//!
//! ## Modules
//!
//! - [`admission`] — opening a challenge against a controlled hex
//! - [`contribution`] — best-effort contest scoring during the window
//! - [`resolution`] — the exactly-once terminal transition

pub mod admission;
pub mod contribution;
pub mod resolution;

use turf_types::{ChallengeId, HexId};

/// Error types for challenge operations.
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    /// Malformed input.
    #[error("validation: {0}")]
    Validation(String),

    /// The hex has never been claimed.
    #[error("territory {0} not found")]
    NotFound(HexId),

    /// The hex is uncontrolled; claim it instead.
    #[error("territory {0} is not controlled")]
    NotControlled(HexId),

    /// A guild cannot challenge its own territory.
    #[error("cannot challenge own territory")]
    SelfChallenge,

    /// One live challenge per hex.
    #[error("challenge already active")]
    ChallengeAlreadyActive(ChallengeId),

    /// The attacker must match or exceed the defender's stake.
    #[error("must match defender stake: {required}")]
    InsufficientStake { required: u64 },

    /// Unknown challenge id.
    #[error("challenge {0} not found")]
    UnknownChallenge(ChallengeId),

    #[error(transparent)]
    Vault(#[from] turf_vault::VaultError),

    #[error(transparent)]
    Db(#[from] turf_db::DbError),

    #[error(transparent)]
    Territory(#[from] turf_territory::TerritoryError),
}

pub type Result<T> = std::result::Result<T, ChallengeError>;
