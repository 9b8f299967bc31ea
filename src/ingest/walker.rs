use walkdir::WalkDir;
use std::path::{Path, PathBuf};
use crate::error::Result;

/// Files whose name starts with '.' are transfers still in progress.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Discover every regular file under `root`, recursively, in walk order.
///
/// Format recognition happens later; this only filters out directories,
/// hidden files and entries that cannot be read.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(crate::error::CdrlogError::InvalidInput(format!(
            "not a directory: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() || is_hidden(entry.path()) {
            continue;
        }

        files.push(entry.into_path());
    }

    log::info!("Discovered {} files in {}", files.len(), root.display());
    Ok(files)
}
