//! SQL schema definitions.

/// Complete schema for Turf v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Guild vaults & ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS guild_vaults (
    guild_id TEXT PRIMARY KEY,
    balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS vault_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    guild_id TEXT NOT NULL REFERENCES guild_vaults(guild_id),
    tx_type TEXT NOT NULL,
    amount INTEGER NOT NULL,
    balance_before INTEGER NOT NULL,
    balance_after INTEGER NOT NULL,
    reason TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vault_tx_guild ON vault_transactions(guild_id, id);

-- ============================================================
-- Territories & challenges
-- ============================================================

CREATE TABLE IF NOT EXISTS territories (
    hex_id INTEGER PRIMARY KEY,
    controlling_guild_id TEXT,
    current_stake INTEGER NOT NULL DEFAULT 0,
    controlled_at INTEGER,
    control_ends_at INTEGER,
    active_challenge_id INTEGER,
    center_lat REAL NOT NULL,
    center_lon REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_territories_expiry
    ON territories(control_ends_at) WHERE controlling_guild_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS challenges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hex_id INTEGER NOT NULL REFERENCES territories(hex_id),
    defender_guild_id TEXT NOT NULL,
    defender_stake INTEGER NOT NULL,
    attacker_guild_id TEXT NOT NULL,
    attacker_stake INTEGER NOT NULL,
    starts_at INTEGER NOT NULL,
    ends_at INTEGER NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    defender_score INTEGER NOT NULL DEFAULT 0,
    attacker_score INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_challenges_hex ON challenges(hex_id);
CREATE INDEX IF NOT EXISTS idx_challenges_unresolved
    ON challenges(ends_at) WHERE resolved = 0;

CREATE TABLE IF NOT EXISTS contributions (
    challenge_id INTEGER NOT NULL REFERENCES challenges(id),
    username TEXT NOT NULL,
    share_points INTEGER NOT NULL DEFAULT 0,
    tune_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (challenge_id, username)
);

-- ============================================================
-- Map nodes (points of interest)
-- ============================================================

CREATE TABLE IF NOT EXISTS nodes (
    node_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    traffic_score INTEGER NOT NULL DEFAULT 0,
    hex_id INTEGER
);

CREATE INDEX IF NOT EXISTS idx_nodes_position ON nodes(lat, lon);
CREATE INDEX IF NOT EXISTS idx_nodes_hex ON nodes(hex_id);

-- ============================================================
-- Durable delayed triggers
-- ============================================================

CREATE TABLE IF NOT EXISTS scheduled_triggers (
    kind TEXT NOT NULL,
    target_id INTEGER NOT NULL,
    fire_at INTEGER NOT NULL,
    armed_at INTEGER NOT NULL,
    fired_at INTEGER,
    PRIMARY KEY (kind, target_id)
);

CREATE INDEX IF NOT EXISTS idx_triggers_pending
    ON scheduled_triggers(fire_at) WHERE fired_at IS NULL;

-- ============================================================
-- Guild roster (stand-in for the external membership service)
-- ============================================================

CREATE TABLE IF NOT EXISTS guild_members (
    username TEXT PRIMARY KEY,
    guild_id TEXT NOT NULL,
    is_officer INTEGER NOT NULL DEFAULT 0,
    joined_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_guild ON guild_members(guild_id);
"#;
