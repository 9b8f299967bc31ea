//! Live watch mode: log CDR files as soon as they land in a watched directory.
//!
//! A notify thread watches every configured path and debounces events; one
//! async loop receives the settled paths and runs the ingestion pipeline for
//! each, strictly one file at a time.

mod watcher;

pub use watcher::{classify_event, spawn_watcher, EventAction};

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cdr::FormatCatalog;
use crate::db::LogStore;
use crate::error::{CdrlogError, Result};
use crate::ingest::process_file;

/// Longest a blocking receive runs, so a cancelled loop frees its pool thread.
const RECV_POLL: Duration = Duration::from_secs(1);

/// Handle one debounced path. Per-file failures are logged, never returned.
pub async fn handle_file_event(catalog: &FormatCatalog, store: &dyn LogStore, path: &Path) {
    if !path.is_file() {
        log::debug!("watch: {} is not a regular file, ignoring", path.display());
        return;
    }

    match process_file(catalog, store, path).await {
        Ok(_) => {}
        Err(CdrlogError::UnrecognizedFormat(name)) => {
            log::warn!("watch: skipping {}, unrecognized CDR file name {}", path.display(), name);
        }
        Err(e) if e.is_persistence() => {
            log::error!(
                "watch: {} extracted but not logged ({}); the next reconciliation pass will pick it up",
                path.display(),
                e
            );
        }
        Err(e) => log::error!("Error processing file {}: {}", path.display(), e),
    }
}

/// Watch `roots` and process settled files until the watcher stops.
///
/// Fails immediately when a root cannot be watched. The watcher thread only
/// stops on failure, so this never returns `Ok` while live mode is healthy.
pub async fn run_watcher(
    catalog: &FormatCatalog,
    store: &dyn LogStore,
    roots: Vec<PathBuf>,
    debounce_ms: u64,
) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    spawn_watcher(&roots, Duration::from_millis(debounce_ms), tx)?;
    let rx = Arc::new(Mutex::new(rx));

    loop {
        let rx_clone = rx.clone();
        let received = tokio::task::spawn_blocking(move || {
            rx_clone
                .lock()
                .map_err(|_| mpsc::RecvTimeoutError::Disconnected)
                .and_then(|rx| rx.recv_timeout(RECV_POLL))
        })
        .await
        .map_err(|e| CdrlogError::Watch(format!("watcher task join: {}", e)))?;

        match received {
            Ok(path) => handle_file_event(catalog, store, &path).await,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(CdrlogError::Watch("watcher thread stopped".to_string()))
            }
        }
    }
}
