//! Map node (point-of-interest) queries.
//!
//! Node creation and traffic scoring belong to the external map pipeline;
//! this core reads nodes and maintains their territory link.

use rusqlite::Connection;
use turf_types::HexId;

use crate::Result;

/// A raw node row.
#[derive(Clone, Debug)]
pub struct NodeRow {
    pub node_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub traffic_score: u64,
    pub hex_id: Option<HexId>,
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<NodeRow> {
    Ok(NodeRow {
        node_id: row.get(0)?,
        name: row.get(1)?,
        lat: row.get(2)?,
        lon: row.get(3)?,
        traffic_score: row.get::<_, i64>(4)? as u64,
        hex_id: row.get::<_, Option<i64>>(5)?.map(HexId::from_i64),
    })
}

/// Create or refresh a node record (leaves the territory link alone on
/// refresh).
pub fn upsert(
    conn: &Connection,
    node_id: &str,
    name: &str,
    lat: f64,
    lon: f64,
    traffic_score: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO nodes (node_id, name, lat, lon, traffic_score)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(node_id) DO UPDATE SET
             name = excluded.name,
             lat = excluded.lat,
             lon = excluded.lon,
             traffic_score = excluded.traffic_score",
        rusqlite::params![node_id, name, lat, lon, traffic_score as i64],
    )?;
    Ok(())
}

/// Nodes whose coordinates fall inside a bounding rectangle (cheap
/// prefilter; the caller applies the authoritative cell-identity check).
pub fn in_rect(
    conn: &Connection,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
) -> Result<Vec<NodeRow>> {
    let mut stmt = conn.prepare(
        "SELECT node_id, name, lat, lon, traffic_score, hex_id FROM nodes
         WHERE lat BETWEEN ?1 AND ?2 AND lon BETWEEN ?3 AND ?4",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![min_lat, max_lat, min_lon, max_lon],
            row_to_node,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Link a node to a hex unless it is already linked elsewhere.
/// Returns true when the link was made (or already pointed at this hex).
pub fn link_if_unlinked(conn: &Connection, node_id: &str, hex_id: HexId) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE nodes SET hex_id = ?2
         WHERE node_id = ?1 AND (hex_id IS NULL OR hex_id = ?2)",
        rusqlite::params![node_id, hex_id.as_i64()],
    )?;
    Ok(changed == 1)
}

/// Unlink every node attached to a hex. Returns how many were unlinked.
pub fn unlink_hex(conn: &Connection, hex_id: HexId) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE nodes SET hex_id = NULL WHERE hex_id = ?1",
        [hex_id.as_i64()],
    )?;
    Ok(changed)
}

/// Node ids currently linked to a hex.
pub fn linked_to(conn: &Connection, hex_id: HexId) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT node_id FROM nodes WHERE hex_id = ?1 ORDER BY node_id")?;
    let rows = stmt
        .query_map([hex_id.as_i64()], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_upsert_and_rect_query() {
        let conn = test_db();
        upsert(&conn, "n1", "Fountain", 0.001, 0.002, 5).expect("upsert");
        upsert(&conn, "n2", "Gate", 0.5, 0.5, 3).expect("upsert");

        let hits = in_rect(&conn, -0.01, 0.01, -0.01, 0.01).expect("rect");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, "n1");
        assert_eq!(hits[0].traffic_score, 5);
    }

    #[test]
    fn test_upsert_refresh_keeps_link() {
        let conn = test_db();
        upsert(&conn, "n1", "Fountain", 0.001, 0.002, 5).expect("upsert");
        link_if_unlinked(&conn, "n1", HexId(9)).expect("link");

        upsert(&conn, "n1", "Fountain Plaza", 0.001, 0.002, 8).expect("refresh");
        let hits = in_rect(&conn, -0.01, 0.01, -0.01, 0.01).expect("rect");
        assert_eq!(hits[0].name, "Fountain Plaza");
        assert_eq!(hits[0].hex_id, Some(HexId(9)));
    }

    #[test]
    fn test_link_respects_existing_link() {
        let conn = test_db();
        upsert(&conn, "n1", "Fountain", 0.0, 0.0, 0).expect("upsert");

        assert!(link_if_unlinked(&conn, "n1", HexId(1)).expect("link"));
        assert!(!link_if_unlinked(&conn, "n1", HexId(2)).expect("steal"));
        // Re-linking to the same hex is fine.
        assert!(link_if_unlinked(&conn, "n1", HexId(1)).expect("relink"));

        assert_eq!(linked_to(&conn, HexId(1)).expect("list"), vec!["n1"]);
        assert!(linked_to(&conn, HexId(2)).expect("list").is_empty());
    }

    #[test]
    fn test_unlink_hex() {
        let conn = test_db();
        upsert(&conn, "n1", "A", 0.0, 0.0, 0).expect("upsert");
        upsert(&conn, "n2", "B", 0.0, 0.0, 0).expect("upsert");
        upsert(&conn, "n3", "C", 0.0, 0.0, 0).expect("upsert");
        link_if_unlinked(&conn, "n1", HexId(1)).expect("link");
        link_if_unlinked(&conn, "n2", HexId(1)).expect("link");
        link_if_unlinked(&conn, "n3", HexId(2)).expect("link");

        assert_eq!(unlink_hex(&conn, HexId(1)).expect("unlink"), 2);
        assert!(linked_to(&conn, HexId(1)).expect("list").is_empty());
        assert_eq!(linked_to(&conn, HexId(2)).expect("list"), vec!["n3"]);
    }
}
