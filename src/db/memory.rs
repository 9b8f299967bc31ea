//! In-memory `LogStore` for tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::store::LogStore;
use crate::cdr::LogEntry;
use crate::error::{CdrlogError, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    known: HashSet<String>,
    fail_appends: bool,
    appends: Mutex<Vec<Vec<LogEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_known<I: IntoIterator<Item = S>, S: Into<String>>(names: I) -> Self {
        Self {
            known: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_appends: true,
            ..Self::default()
        }
    }

    /// One element per `append` call.
    pub fn appends(&self) -> Vec<Vec<LogEntry>> {
        self.appends.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn known_file_names(&self, _root: &Path) -> Result<HashSet<String>> {
        Ok(self.known.clone())
    }

    async fn append(&self, entries: &[LogEntry]) -> Result<()> {
        if self.fail_appends {
            return Err(CdrlogError::Persistence("store unavailable".to_string()));
        }
        self.appends.lock().unwrap().push(entries.to_vec());
        Ok(())
    }
}
