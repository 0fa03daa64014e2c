//! # turf-geo
//!
//! Fixed-resolution hex grid over the map.
//!
//! The world is partitioned into pointy-top hexagons laid out in axial
//! coordinates on an equirectangular lat/lon projection: longitude maps to
//! x and latitude to y, both in degrees. One resolution for the whole game,
//! set by [`HEX_RADIUS_DEG`].
//!
//! All functions are pure; persistence and node lookup live elsewhere.

use serde::{Deserialize, Serialize};
use turf_types::HexId;

/// Circumradius of a hex cell in degrees (~550 m of latitude).
pub const HEX_RADIUS_DEG: f64 = 0.005;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// A latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

/// Axis-aligned bounding rectangle in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Rect {
    /// Whether the point falls inside the rectangle (inclusive).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// The hex cell containing a point.
pub fn cell_at(lat: f64, lon: f64) -> HexId {
    // Fractional axial coordinates for a pointy-top grid.
    let q = (SQRT_3 / 3.0 * lon - lat / 3.0) / HEX_RADIUS_DEG;
    let r = (2.0 / 3.0 * lat) / HEX_RADIUS_DEG;
    let (q, r) = axial_round(q, r);
    HexId::from_axial(q, r)
}

/// Centroid of a hex cell.
pub fn center(hex: HexId) -> LatLng {
    let q = f64::from(hex.q());
    let r = f64::from(hex.r());
    LatLng {
        lon: HEX_RADIUS_DEG * SQRT_3 * (q + r / 2.0),
        lat: HEX_RADIUS_DEG * 1.5 * r,
    }
}

/// The six corners of a hex cell, counter-clockwise from the east-most
/// upper corner.
pub fn boundary(hex: HexId) -> [LatLng; 6] {
    let c = center(hex);
    let mut corners = [LatLng { lat: 0.0, lon: 0.0 }; 6];
    for (i, corner) in corners.iter_mut().enumerate() {
        // Pointy-top corners sit at 30° + 60°·i.
        let angle = std::f64::consts::PI / 180.0 * (60.0 * i as f64 + 30.0);
        *corner = LatLng {
            lon: c.lon + HEX_RADIUS_DEG * angle.cos(),
            lat: c.lat + HEX_RADIUS_DEG * angle.sin(),
        };
    }
    corners
}

/// Bounding lat/lon rectangle of a hex cell.
///
/// A pointy-top hex spans `sqrt(3)·R` in longitude and `2·R` in latitude.
pub fn bounding_rect(hex: HexId) -> Rect {
    let c = center(hex);
    Rect {
        min_lat: c.lat - HEX_RADIUS_DEG,
        max_lat: c.lat + HEX_RADIUS_DEG,
        min_lon: c.lon - HEX_RADIUS_DEG * SQRT_3 / 2.0,
        max_lon: c.lon + HEX_RADIUS_DEG * SQRT_3 / 2.0,
    }
}

/// Whether a cell id denotes a real place on the map.
pub fn is_valid(hex: HexId) -> bool {
    let c = center(hex);
    c.lat.abs() <= 90.0 && c.lon.abs() <= 180.0
}

/// Round fractional axial coordinates to the containing cell.
///
/// Standard cube rounding: round all three cube coordinates, then repair
/// the one with the largest rounding error so they still sum to zero.
fn axial_round(q: f64, r: f64) -> (i32, i32) {
    let x = q;
    let z = r;
    let y = -x - z;

    let mut rx = x.round();
    let mut rz = z.round();
    let ry = y.round();

    let dx = (rx - x).abs();
    let dy = (ry - y).abs();
    let dz = (rz - z).abs();

    if dx > dy && dx > dz {
        rx = -ry - rz;
    } else if dy <= dz {
        rz = -rx - ry;
    }

    (rx as i32, rz as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_round_trips_to_same_cell() {
        for (q, r) in [(0, 0), (1, 0), (0, 1), (-5, 12), (300, -4500), (-2000, 17)] {
            let hex = HexId::from_axial(q, r);
            let c = center(hex);
            assert_eq!(cell_at(c.lat, c.lon), hex, "center of {hex} must map back");
        }
    }

    #[test]
    fn test_origin_cell() {
        assert_eq!(cell_at(0.0, 0.0), HexId::from_axial(0, 0));
    }

    #[test]
    fn test_nearby_points_share_cell() {
        let hex = HexId::from_axial(7, -3);
        let c = center(hex);
        // Well inside the inradius (sqrt(3)/2 · R ≈ 0.00433°).
        let eps = HEX_RADIUS_DEG * 0.4;
        assert_eq!(cell_at(c.lat + eps, c.lon), hex);
        assert_eq!(cell_at(c.lat - eps, c.lon), hex);
        assert_eq!(cell_at(c.lat, c.lon + eps), hex);
        assert_eq!(cell_at(c.lat, c.lon - eps), hex);
    }

    #[test]
    fn test_far_point_different_cell() {
        let hex = HexId::from_axial(7, -3);
        let c = center(hex);
        assert_ne!(cell_at(c.lat + 3.0 * HEX_RADIUS_DEG, c.lon), hex);
    }

    #[test]
    fn test_boundary_within_bounding_rect() {
        let hex = HexId::from_axial(-12, 40);
        let rect = bounding_rect(hex);
        for corner in boundary(hex) {
            // Corners sit exactly on the rect edges; allow float slack.
            assert!(corner.lat >= rect.min_lat - 1e-12 && corner.lat <= rect.max_lat + 1e-12);
            assert!(corner.lon >= rect.min_lon - 1e-12 && corner.lon <= rect.max_lon + 1e-12);
        }
    }

    #[test]
    fn test_bounding_rect_contains_center() {
        let hex = HexId::from_axial(3, 3);
        let c = center(hex);
        assert!(bounding_rect(hex).contains(c.lat, c.lon));
    }

    #[test]
    fn test_rect_excludes_outside_points() {
        let hex = HexId::from_axial(0, 0);
        let rect = bounding_rect(hex);
        assert!(!rect.contains(rect.max_lat + 0.001, 0.0));
        assert!(!rect.contains(0.0, rect.min_lon - 0.001));
    }

    #[test]
    fn test_validity() {
        assert!(is_valid(HexId::from_axial(0, 0)));
        // r pushed far beyond the pole.
        assert!(!is_valid(HexId::from_axial(0, 20_000)));
    }

    #[test]
    fn test_adjacent_centers_are_distinct_cells() {
        let a = HexId::from_axial(10, 10);
        let b = HexId::from_axial(11, 10);
        assert_ne!(center(a), center(b));
        assert_ne!(cell_at(center(a).lat, center(a).lon), cell_at(center(b).lat, center(b).lon));
    }
}
