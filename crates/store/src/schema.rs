//! SQLite schema for the document engine.
//!
//! One row per tiddler, keyed by a unique constraint on the title; the field
//! mapping is stored as a JSON column. The rowid is storage-internal and
//! never leaves this crate.

use rusqlite::Connection;
use tracing::{debug, info, trace};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create the complete schema
///
/// Includes the schema version tracking table and the tiddlers table with
/// its unique title constraint.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS tiddlers (
    title TEXT NOT NULL,
    fields_json TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(title)
);

INSERT OR IGNORE INTO schema_version (version) VALUES (1);
"#;

/// Get the current schema version from the database
///
/// Returns 0 if the schema_version table doesn't exist or is empty.
pub fn current_version(conn: &Connection) -> rusqlite::Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        trace!("schema_version table does not exist, returning version 0");
        return Ok(0);
    }

    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;

    Ok(version.unwrap_or(0))
}

/// Apply pending migrations up to SCHEMA_VERSION
///
/// This is idempotent - running it multiple times is safe.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let current = current_version(conn)?;
    debug!("current schema version: {}, target: {}", current, SCHEMA_VERSION);

    if current >= SCHEMA_VERSION {
        trace!("schema is up to date, no migration needed");
        return Ok(());
    }

    info!("migrating schema from version {} to {}", current, SCHEMA_VERSION);
    conn.execute_batch(SCHEMA_SQL)?;
    info!("schema migration complete");
    Ok(())
}
