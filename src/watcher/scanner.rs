//! Directory scanner for the initial file list.
//!
//! Walks a directory, pruning ignored folders, and returns the paths of
//! watched files relative to the watch root.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::filter::PathMatcher;

/// Walk `dir` (which lies under `root`) and collect watched files.
///
/// Returned paths are relative to `root` and sorted. Unreadable entries are
/// logged and skipped.
pub fn scan_directory(
    root: &Path,
    dir: &Path,
    matcher: &PathMatcher,
    follow_links: bool,
) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut errors = 0_u64;

    let walker = WalkDir::new(dir)
        .follow_links(follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            entry
                .path()
                .strip_prefix(root)
                .map_or(true, |rel| !matcher.can_prune(rel))
        });

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    continue;
                }
                let Ok(relative) = entry.path().strip_prefix(root) else {
                    continue;
                };
                if matcher.is_watched(relative) {
                    found.push(relative.to_path_buf());
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error walking directory");
                errors += 1;
            }
        }
    }

    tracing::debug!(
        path = %dir.display(),
        found = found.len(),
        errors,
        "Directory scan complete"
    );

    found
}
