//! SQLite loading log.
//!
//! Connections are opened per call on tokio's blocking pool; SQLite's WAL mode
//! and busy timeout let concurrent reconcile workers and the `stats` reader
//! share the file.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::error::{CdrlogError, Result};

pub mod migrate;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use store::LogStore;

const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA busy_timeout = 5000;";

/// Handle to the loading-log database file.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(conn)
    }

    /// Run `f` against a fresh connection on the blocking pool.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        task::spawn_blocking(move || {
            let mut conn = db.open_connection()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| CdrlogError::Persistence(format!("database task failed: {}", e)))?
    }

    /// Create or upgrade the schema. Returns the versions applied.
    pub async fn initialize(&self) -> Result<Vec<u32>> {
        self.with_connection(migrate::run_migrations).await
    }

    /// Open an existing loading log for reading, refusing an uninitialized or
    /// out-of-date schema.
    pub async fn open_existing(db_path: &Path) -> Result<Self> {
        if !db_path.is_file() {
            return Err(CdrlogError::Config(format!(
                "loading log {} does not exist",
                db_path.display()
            )));
        }
        let db = Self::new(db_path);
        db.with_connection(|conn| migrate::ensure_current(conn)).await?;
        Ok(db)
    }
}
