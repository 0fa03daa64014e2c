//! Guild roster queries.
//!
//! Membership and roles are owned by the external guild service; this
//! table is the daemon's local mirror of the two facts the conquest core
//! needs (who is in which guild, and who may commit guild funds).

use rusqlite::{Connection, OptionalExtension};

use crate::Result;

/// Record (or update) a member's guild and officer flag.
pub fn put_member(
    conn: &Connection,
    username: &str,
    guild_id: &str,
    is_officer: bool,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO guild_members (username, guild_id, is_officer, joined_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(username) DO UPDATE SET
             guild_id = excluded.guild_id,
             is_officer = excluded.is_officer",
        rusqlite::params![username, guild_id, i64::from(is_officer), now as i64],
    )?;
    Ok(())
}

/// The guild a player belongs to, if any.
pub fn guild_of(conn: &Connection, username: &str) -> Result<Option<String>> {
    let guild = conn
        .query_row(
            "SELECT guild_id FROM guild_members WHERE username = ?1",
            [username],
            |row| row.get(0),
        )
        .optional()?;
    Ok(guild)
}

/// Whether a player is an officer of the given guild.
pub fn is_officer(conn: &Connection, username: &str, guild_id: &str) -> Result<bool> {
    let officer = conn
        .query_row(
            "SELECT is_officer FROM guild_members WHERE username = ?1 AND guild_id = ?2",
            rusqlite::params![username, guild_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(officer == Some(1))
}
