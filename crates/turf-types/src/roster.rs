//! Membership and authorization interface.
//!
//! Guild membership and role management live outside this core. The
//! conquest services only need two questions answered, so they take the
//! answers through this trait rather than a concrete service client.

use crate::GuildId;

/// External membership/authorization collaborator.
pub trait Roster: Send + Sync {
    /// The guild the player currently belongs to, if any.
    fn guild_of(&self, username: &str) -> Option<GuildId>;

    /// Whether the player may commit guild funds (officer or leader).
    fn is_officer(&self, username: &str, guild_id: &str) -> bool;
}

/// Fixed in-memory roster for tests.
#[derive(Debug, Default)]
pub struct StaticRoster {
    members: Vec<(String, GuildId, bool)>,
}

impl StaticRoster {
    /// Add a member; `officer` grants fund authority.
    pub fn with_member(mut self, username: &str, guild_id: &str, officer: bool) -> Self {
        self.members
            .push((username.to_string(), guild_id.to_string(), officer));
        self
    }
}

impl Roster for StaticRoster {
    fn guild_of(&self, username: &str) -> Option<GuildId> {
        self.members
            .iter()
            .find(|(u, _, _)| u == username)
            .map(|(_, g, _)| g.clone())
    }

    fn is_officer(&self, username: &str, guild_id: &str) -> bool {
        self.members
            .iter()
            .any(|(u, g, officer)| u == username && g == guild_id && *officer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_roster_lookup() {
        let roster = StaticRoster::default()
            .with_member("ada", "guild-a", true)
            .with_member("bob", "guild-a", false);

        assert_eq!(roster.guild_of("ada").as_deref(), Some("guild-a"));
        assert_eq!(roster.guild_of("eve"), None);
        assert!(roster.is_officer("ada", "guild-a"));
        assert!(!roster.is_officer("bob", "guild-a"));
        assert!(!roster.is_officer("ada", "guild-b"));
    }
}
