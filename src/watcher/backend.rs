//! OS file notification backend using notify-rs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;

use crate::error::WatcherError;
use crate::Result;

/// Window used to coalesce bursts of raw notifications for one path.
pub const BACKEND_DEBOUNCE: Duration = Duration::from_millis(50);

/// What the backend thread hands to the engine.
#[derive(Debug)]
pub enum RawSignal {
    /// Paths touched since the last batch.
    Paths(Vec<PathBuf>),
    /// The backend can no longer deliver events.
    Fatal(WatcherError),
}

/// Recursive watch on one directory. Dropping it stops the OS watch.
pub struct FileWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl FileWatcher {
    /// Start watching `root` recursively, forwarding batches to `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or the directory
    /// cannot be watched. Running out of watch handles is reported as
    /// [`WatcherError::ResourceExhausted`].
    pub fn start(
        root: &Path,
        debounce: Duration,
        tx: mpsc::UnboundedSender<RawSignal>,
    ) -> Result<Self> {
        let callback_root = root.to_path_buf();
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            let signal = match result {
                Ok(events) => {
                    RawSignal::Paths(events.into_iter().map(|event| event.path).collect())
                }
                Err(e) => match WatcherError::from_notify(&callback_root, &e) {
                    fatal @ WatcherError::ResourceExhausted(_) => RawSignal::Fatal(fatal),
                    other => {
                        tracing::error!(error = %other, "Watch error");
                        return;
                    }
                },
            };
            // Engine gone means shutdown.
            let _ = tx.send(signal);
        })
        .map_err(|e| WatcherError::from_notify(root, &e))?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatcherError::from_notify(root, &e))?;

        tracing::debug!(path = %root.display(), "Watching directory");

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_watch_nonexistent_dir_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = FileWatcher::start(Path::new("/nonexistent/directory"), BACKEND_DEBOUNCE, tx);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reports_written_file() {
        let tmp = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher = FileWatcher::start(tmp.path(), BACKEND_DEBOUNCE, tx).unwrap();

        std::fs::write(tmp.path().join("a.css"), "a {}").unwrap();

        let signal = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within timeout")
            .unwrap();
        match signal {
            RawSignal::Paths(paths) => {
                assert!(paths.iter().any(|p| p.ends_with("a.css")));
            }
            RawSignal::Fatal(e) => panic!("unexpected fatal signal: {e}"),
        }
    }
}
