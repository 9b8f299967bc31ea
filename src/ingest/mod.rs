//! Ingestion orchestrator: dispatch → extract → segment → append, once per file.

pub mod reconcile;
pub mod walker;

pub use reconcile::{missing_files, plan, reconcile, ReconcilePlan, ReconcileReport};
pub use walker::{discover_files, is_hidden};

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::cdr::{
    extract, is_long_window, segment, Extraction, FormatCatalog, FormatDescriptor, LogEntry,
    LONG_WINDOW_DAYS,
};
use crate::db::LogStore;
use crate::error::{CdrlogError, Result};

/// Run extraction on the blocking pool so concurrent files don't stall the runtime.
async fn extract_blocking(path: &Path, descriptor: FormatDescriptor) -> Result<Extraction> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract(&path, &descriptor))
        .await
        .map_err(|e| {
            CdrlogError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("extraction task failed: {}", e),
            ))
        })?
}

/// Process one CDR file and append its loading-log entries to `store`.
///
/// Returns the entries written; empty when no line carried a parsable
/// timestamp. Fails with `UnrecognizedFormat` for names outside the catalog
/// and with a persistence error when the store rejects the entries.
pub async fn process_file(
    catalog: &FormatCatalog,
    store: &dyn LogStore,
    path: &Path,
) -> Result<Vec<LogEntry>> {
    let start = std::time::Instant::now();
    let descriptor = catalog.dispatch(path)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_dir = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_time = descriptor.file_timestamp(&file_name);
    let gateway = descriptor.gateway;
    log::debug!("{}: format {}", file_name, descriptor.name);

    let Extraction { window, stats } = extract_blocking(path, descriptor.clone()).await?;

    let Some(window) = window else {
        log::info!(
            "{}: no parsable timestamps in {} line(s), nothing logged",
            file_name,
            stats.lines
        );
        return Ok(Vec::new());
    };

    if is_long_window(&window) {
        log::warn!(
            "{}: window {} .. {} spans more than {} days, check for corrupt timestamps",
            file_name,
            window.begin,
            window.end,
            LONG_WINDOW_DAYS
        );
    }

    let segments = segment(&window);
    let entries = LogEntry::for_segments(
        &file_name,
        &file_dir,
        file_time,
        gateway,
        &segments,
        Utc::now(),
    );

    store.append(&entries).await?;

    log::info!(
        "Gateway: {}, File: {}, Begin: {}, End: {}, Segments: {}, Skipped lines: {}/{} ({:?})",
        gateway.label(),
        file_name,
        window.begin,
        window.end,
        entries.len(),
        stats.skipped(),
        stats.lines,
        start.elapsed()
    );
    Ok(entries)
}
