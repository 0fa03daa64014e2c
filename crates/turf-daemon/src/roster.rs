//! Database-backed [`Roster`] implementation.
//!
//! The guild service owns membership; it pushes changes to the daemon via
//! the `sync_member` RPC, and this mirror answers the two questions the
//! conquest core asks. Holds its own SQLite connection so lookups never
//! contend with the main connection's transactions.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use turf_types::{GuildId, Roster};

/// Roster backed by the `guild_members` mirror table.
pub struct DbRoster {
    conn: Mutex<Connection>,
}

impl DbRoster {
    /// Open a dedicated connection to the daemon database.
    pub fn open(path: &Path) -> turf_db::Result<Self> {
        Ok(Self {
            conn: Mutex::new(turf_db::open(path)?),
        })
    }

    /// In-memory roster for tests.
    pub fn open_memory() -> turf_db::Result<Self> {
        Ok(Self {
            conn: Mutex::new(turf_db::open_memory()?),
        })
    }

    /// Apply a membership change pushed by the guild service.
    pub fn put_member(
        &self,
        username: &str,
        guild_id: &str,
        is_officer: bool,
        now: u64,
    ) -> turf_db::Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| turf_db::DbError::Constraint("roster lock poisoned".into()))?;
        turf_db::queries::roster::put_member(&conn, username, guild_id, is_officer, now)
    }
}

impl Roster for DbRoster {
    fn guild_of(&self, username: &str) -> Option<GuildId> {
        let conn = self.conn.lock().ok()?;
        turf_db::queries::roster::guild_of(&conn, username)
            .map_err(|e| tracing::warn!(username, error = %e, "roster lookup failed"))
            .ok()
            .flatten()
    }

    fn is_officer(&self, username: &str, guild_id: &str) -> bool {
        let Ok(conn) = self.conn.lock() else {
            return false;
        };
        turf_db::queries::roster::is_officer(&conn, username, guild_id)
            .map_err(|e| tracing::warn!(username, error = %e, "roster lookup failed"))
            .unwrap_or(false)
    }
}
