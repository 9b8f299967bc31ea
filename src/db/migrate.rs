//! Loading-log schema, compiled into the binary.
//!
//! The schema version lives in SQLite's `user_version` header field, so a
//! database file carries its own version and a deployed binary needs no
//! `migrations/` directory next to it.

use rusqlite::Connection;

use crate::error::{CdrlogError, Result};

/// One schema step. Versions start at 1 and increase by one.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "cdr_loading_log",
        sql: include_str!("../../migrations/001_cdr_loading_log.sql"),
    },
    Migration {
        version: 2,
        name: "indexes",
        sql: include_str!("../../migrations/002_indexes.sql"),
    },
];

/// Version a fully migrated loading log reports.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Schema version of the open database; 0 for a fresh file.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version)
        .map_err(|_| CdrlogError::Config(format!("invalid loading log schema version {}", version)))
}

/// Apply every migration newer than the database's version.
///
/// Each step runs in its own transaction together with the version bump.
/// Returns the versions applied by this call, empty when already current.
pub fn run_migrations(conn: &mut Connection) -> Result<Vec<u32>> {
    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(CdrlogError::Config(format!(
            "loading log schema version {} is newer than this build supports ({})",
            current, latest
        )));
    }

    let mut applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql).map_err(|e| {
            CdrlogError::Config(format!("migration {} ({}) failed: {}", migration.version, migration.name, e))
        })?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;

        log::info!("Loading log schema: applied {} (version {})", migration.name, migration.version);
        applied.push(migration.version);
    }

    Ok(applied)
}

/// Fail unless the schema is fully migrated. Read-only tools call this instead
/// of migrating a database they do not own.
pub fn ensure_current(conn: &Connection) -> Result<()> {
    let version = schema_version(conn)?;
    if version != latest_version() {
        return Err(CdrlogError::Config(format!(
            "loading log schema is at version {}, expected {}; run cdrlog once to initialize it",
            version,
            latest_version()
        )));
    }
    Ok(())
}
