//! Hex cell identifiers.
//!
//! The map is partitioned into pointy-top hexagons at one fixed resolution.
//! A cell is addressed by its axial coordinates `(q, r)`, packed into a
//! single `u64` so the id is hashable, orderable, and stores as a SQLite
//! `INTEGER`. The grid math itself lives in `turf-geo`.

use serde::{Deserialize, Serialize};

/// A fixed-resolution hex cell identifier.
///
/// Packs the axial pair as `(q as u32) << 32 | (r as u32)`; both halves
/// round-trip through two's complement, so negative coordinates are fine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexId(pub u64);

impl HexId {
    /// Build an id from axial coordinates.
    pub fn from_axial(q: i32, r: i32) -> Self {
        Self((u64::from(q as u32) << 32) | u64::from(r as u32))
    }

    /// Axial `q` coordinate.
    pub fn q(self) -> i32 {
        (self.0 >> 32) as u32 as i32
    }

    /// Axial `r` coordinate.
    pub fn r(self) -> i32 {
        self.0 as u32 as i32
    }

    /// The raw packed value.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// The packed value as stored in SQLite.
    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }

    /// Rebuild an id from its SQLite representation.
    pub fn from_i64(raw: i64) -> Self {
        Self(raw as u64)
    }
}

impl std::fmt::Display for HexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hex({},{})", self.q(), self.r())
    }
}
