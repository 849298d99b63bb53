//! Session registry: the watched file set and the connected-client count.
//!
//! The registry owns its state outright and is driven by a single task
//! reading the bus's lossless registry feed, so all mutation happens on one
//! consumer and no event is skipped.

use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::bus::BusEvent;
use crate::config::WatchRoot;
use crate::watcher::ChangeRecord;

/// Files currently known to exist, in insertion order, keyed by relative path.
#[derive(Debug, Default, Clone)]
pub struct WatchedFileSet {
    files: Vec<ChangeRecord>,
    paths: HashSet<String>,
}

impl WatchedFileSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Returns `false` if its relative path was already present.
    pub fn insert(&mut self, record: ChangeRecord) -> bool {
        if !self.paths.insert(record.relative_path.clone()) {
            return false;
        }
        self.files.push(record);
        true
    }

    /// Remove the record with this relative path.
    pub fn remove(&mut self, relative_path: &str) -> Option<ChangeRecord> {
        if !self.paths.remove(relative_path) {
            return None;
        }
        let idx = self
            .files
            .iter()
            .position(|r| r.relative_path == relative_path)?;
        Some(self.files.remove(idx))
    }

    #[must_use]
    pub fn contains(&self, relative_path: &str) -> bool {
        self.paths.contains(relative_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.files.iter()
    }

    /// Whether two files share a base name.
    ///
    /// A linear scan, run once at ready time; file sets are small enough
    /// that an incremental index is not worth keeping.
    #[must_use]
    pub fn has_duplicate_file_names(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.files.len());
        self.files.iter().any(|r| !seen.insert(r.file_name.as_str()))
    }
}

/// Tracks watched files and client sessions from bus events.
#[derive(Debug)]
pub struct SessionRegistry {
    root: WatchRoot,
    verbose: bool,
    files: WatchedFileSet,
    sessions: usize,
    ready: bool,
}

impl SessionRegistry {
    /// Create a registry for `root`. With `verbose`, the file list is logged
    /// under a header as files are added.
    #[must_use]
    pub fn new(root: WatchRoot, verbose: bool) -> Self {
        Self {
            root,
            verbose,
            files: WatchedFileSet::new(),
            sessions: 0,
            ready: false,
        }
    }

    /// Apply one bus event.
    pub fn handle(&mut self, event: &BusEvent) {
        match event {
            BusEvent::FileAdded(record) => self.file_added(record),
            BusEvent::FileDeleted(record) => {
                self.files.remove(&record.relative_path);
            }
            BusEvent::FileModified(_) => {}
            BusEvent::WatchReady => self.watch_ready(),
            BusEvent::Connected => {
                self.sessions += 1;
                tracing::info!(active = self.sessions, "Connected to a socket");
            }
            BusEvent::Disconnected => {
                self.sessions = self.sessions.saturating_sub(1);
                tracing::info!(active = self.sessions, "Disconnected from a socket");
            }
        }
    }

    /// Consume the registry feed until the bus is dropped, then hand back
    /// the final state.
    pub async fn run(mut self, mut feed: mpsc::UnboundedReceiver<BusEvent>) -> Self {
        while let Some(event) = feed.recv().await {
            self.handle(&event);
        }
        self
    }

    /// Number of connected clients.
    #[must_use]
    pub const fn session_count(&self) -> usize {
        self.sessions
    }

    /// Files currently watched.
    #[must_use]
    pub const fn files(&self) -> &WatchedFileSet {
        &self.files
    }

    /// Whether the initial scan has completed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Duplicate base names only confuse clients matching by file name,
    /// which is the case when no root was configured.
    #[must_use]
    pub fn needs_duplicate_name_advisory(&self) -> bool {
        !self.root.configured && self.files.has_duplicate_file_names()
    }

    fn file_added(&mut self, record: &ChangeRecord) {
        if self.verbose {
            if self.files.is_empty() {
                tracing::info!("Live CSS is watching the following file(s):");
            }
            tracing::info!("    {}", record.relative_path);
        }
        self.files.insert(record.clone());
    }

    fn watch_ready(&mut self) {
        self.ready = true;
        tracing::info!(
            files = self.files.len(),
            root = %self.root.path.display(),
            "Live CSS server is ready. Watching {} files from {}",
            self.files.len(),
            self.root.path.display()
        );

        if self.needs_duplicate_name_advisory() {
            tracing::warn!(
                "Some of the files being watched have the same name. live-css would still work fine. \
                 For better experience, start live-css with an appropriate --root parameter"
            );
        }
    }
}
