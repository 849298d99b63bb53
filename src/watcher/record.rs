//! Change records sent to clients.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::WatchRoot;

/// One filesystem change, as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Path relative to the watch root.
    pub relative_path: String,
    /// Absolute path of the file.
    pub full_path: String,
    /// Base name of the file.
    pub file_name: String,
    /// The watch root, only when the operator configured one.
    pub root: Option<String>,
    /// Clients should match on file name alone because no root was configured.
    pub use_only_file_names_for_match: bool,
}

impl ChangeRecord {
    /// Build a record for `relative`, a path under `root`.
    ///
    /// Pure: performs no filesystem access.
    #[must_use]
    pub fn new(relative: &Path, root: &WatchRoot) -> Self {
        let full: PathBuf = root.path.join(relative);
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            relative_path: relative.to_string_lossy().into_owned(),
            full_path: full.to_string_lossy().into_owned(),
            file_name,
            root: root
                .configured
                .then(|| root.path.to_string_lossy().into_owned()),
            use_only_file_names_for_match: !root.configured,
        }
    }
}
