//! Reconciliation: process files under a root that the loading log has not seen.
//!
//! Recovers files missed while the live watcher was down. Per-file failures are
//! counted and logged; only a failure to discover files or to query the store
//! aborts the pass.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};

use super::{discover_files, process_file};
use crate::cdr::FormatCatalog;
use crate::db::LogStore;
use crate::error::{CdrlogError, Result};

/// Files found under a root, and the subset not yet logged.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub discovered: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub discovered: usize,
    pub already_logged: usize,
    /// Files whose entries were appended.
    pub processed: usize,
    pub entries: usize,
    pub unrecognized: usize,
    /// Recognized files with no parsable timestamp.
    pub empty: usize,
    pub failed: usize,
}

impl ReconcileReport {
    fn record(&mut self, path: &Path, outcome: Result<usize>) {
        match outcome {
            Ok(0) => self.empty += 1,
            Ok(n) => {
                self.processed += 1;
                self.entries += n;
            }
            Err(CdrlogError::UnrecognizedFormat(name)) => {
                log::warn!("Skipping {}: unrecognized CDR file name {}", path.display(), name);
                self.unrecognized += 1;
            }
            Err(e) => {
                log::error!("Error processing file {}: {}", path.display(), e);
                self.failed += 1;
            }
        }
    }
}

/// Files whose base name is not in `known`, in the order given.
pub fn missing_files(files: &[PathBuf], known: &HashSet<String>) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|path| {
            path.file_name()
                .map(|n| !known.contains(&*n.to_string_lossy()))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Diff the files under `root` against the store's known names.
pub async fn plan(store: &dyn LogStore, root: &Path) -> Result<ReconcilePlan> {
    let discovered = discover_files(root)?;
    let known = store.known_file_names(root).await?;
    let missing = missing_files(&discovered, &known);
    Ok(ReconcilePlan { discovered, missing })
}

/// Process every file under `root` missing from the store, at most `workers` at a time.
pub async fn reconcile(
    catalog: &FormatCatalog,
    store: &dyn LogStore,
    root: &Path,
    workers: usize,
) -> Result<ReconcileReport> {
    let start = std::time::Instant::now();
    let ReconcilePlan { discovered, missing } = plan(store, root).await?;

    let mut report = ReconcileReport {
        discovered: discovered.len(),
        already_logged: discovered.len() - missing.len(),
        ..ReconcileReport::default()
    };
    log::info!(
        "Scanning {}: {} file(s), {} already logged, {} to process",
        root.display(),
        report.discovered,
        report.already_logged,
        missing.len()
    );

    let outcomes: Vec<(PathBuf, Result<usize>)> = stream::iter(missing)
        .map(|path| async move {
            let outcome = process_file(catalog, store, &path).await.map(|e| e.len());
            (path, outcome)
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    for (path, outcome) in outcomes {
        report.record(&path, outcome);
    }

    log::info!(
        "Reconciled {} in {:?}: processed={}, entries={}, empty={}, unrecognized={}, failed={}",
        root.display(),
        start.elapsed(),
        report.processed,
        report.entries,
        report.empty,
        report.unrecognized,
        report.failed
    );
    Ok(report)
}
