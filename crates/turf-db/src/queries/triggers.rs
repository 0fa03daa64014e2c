//! Durable delayed-trigger queries.
//!
//! One row per armed trigger, keyed `(kind, target_id)`. Rows survive
//! process restarts; the scheduler reloads unfired rows on startup.
//! Firing is recorded by a conditional update so at-least-once delivery
//! cannot double-mark a trigger.

use rusqlite::{Connection, OptionalExtension};
use turf_types::TriggerKind;

use crate::Result;

/// An armed trigger row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerRow {
    pub kind: TriggerKind,
    pub target_id: i64,
    pub fire_at: u64,
    pub armed_at: u64,
}

/// Arm (or re-arm) a trigger. Re-arming replaces the fire time and clears
/// any previous firing record, so the operation is idempotent.
pub fn arm(
    conn: &Connection,
    kind: TriggerKind,
    target_id: i64,
    fire_at: u64,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO scheduled_triggers (kind, target_id, fire_at, armed_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(kind, target_id) DO UPDATE SET
             fire_at = excluded.fire_at,
             armed_at = excluded.armed_at,
             fired_at = NULL",
        rusqlite::params![kind.as_str(), target_id, fire_at as i64, now as i64],
    )?;
    Ok(())
}

fn row_to_trigger(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, i64, i64, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn collect_triggers(raw: Vec<(String, i64, i64, i64)>) -> Result<Vec<TriggerRow>> {
    raw.into_iter()
        .map(|(kind, target_id, fire_at, armed_at)| {
            let kind = TriggerKind::parse(&kind)
                .ok_or_else(|| crate::DbError::Serialization(format!("unknown trigger kind: {kind}")))?;
            Ok(TriggerRow {
                kind,
                target_id,
                fire_at: fire_at as u64,
                armed_at: armed_at as u64,
            })
        })
        .collect()
}

/// All unfired triggers, earliest first.
pub fn pending(conn: &Connection) -> Result<Vec<TriggerRow>> {
    let mut stmt = conn.prepare(
        "SELECT kind, target_id, fire_at, armed_at FROM scheduled_triggers
         WHERE fired_at IS NULL ORDER BY fire_at",
    )?;
    let rows = stmt
        .query_map([], row_to_trigger)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    collect_triggers(rows)
}

/// Unfired triggers that are due at `now`, earliest first.
pub fn due(conn: &Connection, now: u64) -> Result<Vec<TriggerRow>> {
    let mut stmt = conn.prepare(
        "SELECT kind, target_id, fire_at, armed_at FROM scheduled_triggers
         WHERE fired_at IS NULL AND fire_at <= ?1 ORDER BY fire_at",
    )?;
    let rows = stmt
        .query_map([now as i64], row_to_trigger)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    collect_triggers(rows)
}

/// The earliest unfired fire time, if any trigger is armed.
pub fn next_fire_at(conn: &Connection) -> Result<Option<u64>> {
    let next = conn
        .query_row(
            "SELECT MIN(fire_at) FROM scheduled_triggers WHERE fired_at IS NULL",
            [],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()?
        .flatten();
    Ok(next.map(|t| t as u64))
}

/// Record that a trigger fired. Returns false if it was already marked.
pub fn mark_fired(conn: &Connection, kind: TriggerKind, target_id: i64, now: u64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE scheduled_triggers SET fired_at = ?3
         WHERE kind = ?1 AND target_id = ?2 AND fired_at IS NULL",
        rusqlite::params![kind.as_str(), target_id, now as i64],
    )?;
    Ok(changed == 1)
}
