//! Database schema migrations for SQLite.
//!
//! Applied versions are recorded in `schema_migrations`; pending steps run in
//! one transaction.

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use tracing::debug;

use crate::error::{LedgerError, Result};

/// Schema steps, in order. Step `i` upgrades version `i` to `i + 1`.
const MIGRATIONS: &[&str] = &[
    // v1: record storage
    r#"
    CREATE TABLE records (
        seq INTEGER PRIMARY KEY,          -- ledger sequence index, from 0
        record_id BLOB NOT NULL UNIQUE,   -- caller-chosen id
        producer BLOB NOT NULL,           -- 2 bytes
        location BLOB NOT NULL,
        weight INTEGER NOT NULL,          -- u32
        timestamp BLOB NOT NULL,          -- 32 bytes, big-endian
        parent_ids BLOB NOT NULL,         -- 4 bytes big-endian per parent
        kind INTEGER NOT NULL,            -- u8
        content_id BLOB NOT NULL,         -- 32 bytes, derived at append
        signature BLOB NOT NULL,          -- 65 bytes, r || s || v
        appended_at INTEGER NOT NULL      -- local time of append (Unix ms)
    );

    CREATE INDEX idx_records_content_id ON records(content_id);
    "#,
];

/// Current schema version.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let installed = installed_version(conn)?;
    if installed > CURRENT_VERSION {
        return Err(LedgerError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            installed, CURRENT_VERSION
        )));
    }

    let pending = &MIGRATIONS[installed as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (offset, sql) in pending.iter().enumerate() {
        let version = installed + offset as u32 + 1;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, applied_at()],
        )?;
        debug!(version, "applied schema migration");
    }
    tx.commit()?;
    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub fn installed_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?)
}

fn applied_at() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
