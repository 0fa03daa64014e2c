//! Node membership queries for a hex.
//!
//! The bounding-rectangle SQL query is a cheap prefilter; the
//! authoritative membership test recomputes each candidate's cell id from
//! its coordinates. Pure queries, no side effects.

use rusqlite::Connection;
use turf_db::queries::nodes::{self, NodeRow};
use turf_types::HexId;

use crate::Result;

/// All nodes whose coordinates fall inside the hex.
pub fn nodes_in_hex(conn: &Connection, hex_id: HexId) -> Result<Vec<NodeRow>> {
    let rect = turf_geo::bounding_rect(hex_id);
    let candidates = nodes::in_rect(conn, rect.min_lat, rect.max_lat, rect.min_lon, rect.max_lon)?;
    Ok(candidates
        .into_iter()
        .filter(|n| turf_geo::cell_at(n.lat, n.lon) == hex_id)
        .collect())
}

/// Combined traffic score of the hex's member nodes.
///
/// Feeds the minimum-stake rule: busier hexes cost more to claim.
pub fn traffic_in_hex(conn: &Connection, hex_id: HexId) -> Result<u64> {
    Ok(nodes_in_hex(conn, hex_id)?
        .iter()
        .map(|n| n.traffic_score)
        .sum())
}
