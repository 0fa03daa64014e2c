//! # turf-territory
//!
//! Territory control: who holds each hex, at what stake, until when.
//!
//! ## Modules
//!
//! - [`index`] — node membership and traffic for a hex (pure queries)
//! - [`stake`] — claiming an uncontrolled hex
//! - [`expiry`] — reverting lapsed territories to uncontrolled

pub mod expiry;
pub mod index;
pub mod stake;

use turf_types::HexId;

/// Error types for territory operations.
#[derive(Debug, thiserror::Error)]
pub enum TerritoryError {
    /// Malformed input (unknown hex, off-map cell, zero stake).
    #[error("validation: {0}")]
    Validation(String),

    /// Stake below the hex's traffic-scaled minimum.
    #[error("stake below minimum: {required} required")]
    InsufficientStake { required: u64 },

    /// Another guild already controls the hex.
    #[error("territory {0} is already controlled")]
    AlreadyControlled(HexId),

    #[error(transparent)]
    Vault(#[from] turf_vault::VaultError),

    #[error(transparent)]
    Db(#[from] turf_db::DbError),
}

pub type Result<T> = std::result::Result<T, TerritoryError>;
