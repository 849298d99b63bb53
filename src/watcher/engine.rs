//! Watch engine: turns raw notifications into file events on the bus.
//!
//! The engine runs as one task. Raw path batches from the backend and
//! "size settled" reports from per-path stability waits are both handled on
//! that task, so events for any one path are published in the order they
//! were observed. Each path is classified on arrival:
//!
//! - gone: publish `file-deleted` for it (and for known files beneath it)
//! - directory: scan it and treat each watched file inside as a candidate
//! - file: wait for its size to settle, re-validate, then publish
//!   `file-added` the first time and `file-modified` afterwards

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::backend::{FileWatcher, RawSignal, BACKEND_DEBOUNCE};
use super::filter::PathMatcher;
use super::record::ChangeRecord;
use super::scanner::scan_directory;
use super::stability::{wait_for_stable_size, StabilityConfig};
use super::symlink;
use crate::bus::{BusEvent, EventBus};
use crate::config::{Config, WatchRoot};
use crate::error::WatcherError;
use crate::Result;

/// Everything the engine needs to know about what to watch.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub root: WatchRoot,
    pub watch_rules: Vec<String>,
    pub ignore_rules: Vec<String>,
    pub ignore_regex: Vec<String>,
    pub allow_symlinks: bool,
    /// Log each file found by the initial scan at info level.
    pub list_files: bool,
    pub stability: StabilityConfig,
    /// Coalescing window of the OS backend.
    pub debounce: Duration,
}

impl EngineConfig {
    /// Derive engine settings from the application config and a resolved root.
    #[must_use]
    pub fn from_config(config: &Config, root: WatchRoot) -> Self {
        Self {
            root,
            watch_rules: config.watch_rules.clone(),
            ignore_rules: config.ignore_rules.clone(),
            ignore_regex: config.ignore_regex.clone(),
            allow_symlinks: config.allow_symlinks,
            list_files: config.list_files,
            stability: StabilityConfig {
                threshold: config.stability_threshold,
                poll_interval: config.poll_interval,
            },
            debounce: BACKEND_DEBOUNCE,
        }
    }
}

/// A stability wait finished for `relative`.
#[derive(Debug)]
struct Settled {
    relative: PathBuf,
    generation: u64,
    size: Option<u64>,
}

/// Watches the root and publishes file events.
pub struct WatchEngine {
    root: WatchRoot,
    canonical_root: PathBuf,
    matcher: Arc<PathMatcher>,
    allow_symlinks: bool,
    list_files: bool,
    stability: StabilityConfig,
    debounce: Duration,
    bus: EventBus,
    known: HashSet<PathBuf>,
    pending: HashMap<PathBuf, (u64, JoinHandle<()>)>,
    generation: u64,
    ready: bool,
}

impl WatchEngine {
    /// Create an engine publishing to `bus`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the watch or ignore rules are invalid.
    pub fn new(config: EngineConfig, bus: EventBus) -> Result<Self> {
        let matcher = PathMatcher::new(
            &config.root.path,
            &config.watch_rules,
            &config.ignore_rules,
            &config.ignore_regex,
        )?;
        Ok(Self {
            canonical_root: config.root.path.clone(),
            root: config.root,
            matcher: Arc::new(matcher),
            allow_symlinks: config.allow_symlinks,
            list_files: config.list_files,
            stability: config.stability,
            debounce: config.debounce,
            bus,
            known: HashSet::new(),
            pending: HashMap::new(),
            generation: 0,
            ready: false,
        })
    }

    /// Watch until the process ends.
    ///
    /// Publishes a `file-added` for every existing watched file, then
    /// `watch-ready` once, then live events.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS watch cannot be established or the backend
    /// fails fatally (for example when watch handles run out).
    pub async fn run(mut self) -> Result<()> {
        if let Ok(canonical) = tokio::fs::canonicalize(&self.root.path).await {
            self.canonical_root = canonical;
        }

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
        let _watcher = FileWatcher::start(&self.root.path, self.debounce, raw_tx)?;

        self.initial_scan().await?;
        self.ready = true;
        self.bus.publish(BusEvent::WatchReady);

        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel::<Settled>();

        loop {
            tokio::select! {
                signal = raw_rx.recv() => match signal {
                    Some(RawSignal::Paths(paths)) => {
                        for path in paths {
                            self.on_raw_path(&path, &settled_tx).await;
                        }
                    }
                    Some(RawSignal::Fatal(err)) => return Err(err.into()),
                    None => {
                        return Err(WatcherError::BackendClosed(
                            "notification channel closed".to_string(),
                        )
                        .into())
                    }
                },
                Some(settled) = settled_rx.recv() => self.on_settled(settled).await,
            }
        }
    }

    async fn initial_scan(&mut self) -> Result<()> {
        let matcher = Arc::clone(&self.matcher);
        let root = self.root.path.clone();
        let follow = self.allow_symlinks;

        let found = tokio::task::spawn_blocking(move || scan_directory(&root, &root, &matcher, follow))
            .await
            .map_err(|e| crate::Error::internal(format!("scan task failed: {e}")))?;

        for relative in found {
            self.emit_present(&relative).await;
        }
        Ok(())
    }

    async fn on_raw_path(&mut self, path: &Path, settled_tx: &mpsc::UnboundedSender<Settled>) {
        let Some(relative) = self.relative(path) else {
            return;
        };
        if relative.as_os_str().is_empty() {
            return;
        }

        let full = self.root.path.join(&relative);
        let meta = if self.allow_symlinks {
            tokio::fs::metadata(&full).await
        } else {
            tokio::fs::symlink_metadata(&full).await
        };

        match meta {
            Err(_) => self.on_vanished(&relative),
            Ok(meta) if meta.is_dir() => self.on_directory(&relative, settled_tx).await,
            Ok(_) => {
                if self.matcher.is_watched(&relative) {
                    self.schedule(relative, settled_tx);
                }
            }
        }
    }

    async fn on_directory(&mut self, relative: &Path, settled_tx: &mpsc::UnboundedSender<Settled>) {
        if self.matcher.can_prune(relative) {
            return;
        }

        let matcher = Arc::clone(&self.matcher);
        let root = self.root.path.clone();
        let dir = root.join(relative);
        let follow = self.allow_symlinks;
        let found = match tokio::task::spawn_blocking(move || {
            scan_directory(&root, &dir, &matcher, follow)
        })
        .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Directory scan task failed");
                return;
            }
        };

        for file in found {
            if !self.known.contains(&file) {
                self.schedule(file, settled_tx);
            }
        }
    }

    fn on_vanished(&mut self, relative: &Path) {
        let mut gone: Vec<PathBuf> = self
            .known
            .iter()
            .filter(|known| known.starts_with(relative))
            .cloned()
            .collect();
        gone.sort();

        self.pending.retain(|path, (_, handle)| {
            let cancel = path.starts_with(relative);
            if cancel {
                handle.abort();
            }
            !cancel
        });

        for path in gone {
            self.known.remove(&path);
            if self.ready {
                tracing::info!(path = %path.display(), "File removed");
            }
            self.bus
                .publish(BusEvent::FileDeleted(ChangeRecord::new(&path, &self.root)));
        }
    }

    /// Start a stability wait for `relative` unless one is already running.
    fn schedule(&mut self, relative: PathBuf, settled_tx: &mpsc::UnboundedSender<Settled>) {
        if self.pending.contains_key(&relative) {
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let full = self.root.path.join(&relative);
        let stability = self.stability;
        let tx = settled_tx.clone();
        let task_relative = relative.clone();

        let handle = tokio::spawn(async move {
            let size = wait_for_stable_size(&full, stability).await;
            let _ = tx.send(Settled {
                relative: task_relative,
                generation,
                size,
            });
        });
        self.pending.insert(relative, (generation, handle));
    }

    async fn on_settled(&mut self, settled: Settled) {
        match self.pending.get(&settled.relative) {
            Some((generation, _)) if *generation == settled.generation => {
                self.pending.remove(&settled.relative);
            }
            _ => return,
        }

        if settled.size.is_some() {
            self.emit_present(&settled.relative).await;
        } else {
            self.on_vanished(&settled.relative);
        }
    }

    /// Publish an add or change for a file believed to exist.
    async fn emit_present(&mut self, relative: &Path) {
        let full = self.root.path.join(relative);
        let Ok(meta) = tokio::fs::metadata(&full).await else {
            return;
        };
        if !symlink::admit(&full, relative, self.allow_symlinks, &self.matcher).await {
            tracing::trace!(path = %relative.display(), "Dropped by symlink guard");
            return;
        }

        let record = ChangeRecord::new(relative, &self.root);
        if self.known.contains(relative) {
            tracing::info!(
                path = %relative.display(),
                modified = modified_stamp(&meta).as_deref().unwrap_or("-"),
                "File modified"
            );
            self.bus.publish(BusEvent::FileModified(record));
        } else {
            if self.ready {
                tracing::info!(path = %relative.display(), "File added");
            } else if self.list_files {
                tracing::info!(path = %relative.display(), "Watching file");
            } else {
                tracing::debug!(path = %relative.display(), "Watching file");
            }
            self.known.insert(relative.to_path_buf());
            self.bus.publish(BusEvent::FileAdded(record));
        }
    }

    fn relative(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.root.path)
            .or_else(|_| path.strip_prefix(&self.canonical_root))
            .ok()
            .map(Path::to_path_buf)
    }
}

/// Local wall-clock time a file was last modified, as `HH:MM:SS`.
fn modified_stamp(meta: &std::fs::Metadata) -> Option<String> {
    let modified = meta.modified().ok()?;
    let local: chrono::DateTime<chrono::Local> = modified.into();
    Some(local.format("%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine_for(root: &Path, bus: &EventBus) -> WatchEngine {
        let config = EngineConfig::from_config(
            &Config::default(),
            WatchRoot {
                path: root.to_path_buf(),
                configured: true,
            },
        );
        WatchEngine::new(config, bus.clone()).unwrap()
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<BusEvent>) -> Vec<BusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_engine_config_from_config() {
        let config = Config {
            allow_symlinks: true,
            list_files: true,
            stability_threshold: Duration::from_millis(300),
            ..Default::default()
        };
        let root = WatchRoot {
            path: PathBuf::from("/srv"),
            configured: false,
        };
        let engine_config = EngineConfig::from_config(&config, root.clone());
        assert_eq!(engine_config.root, root);
        assert!(engine_config.allow_symlinks);
        assert!(engine_config.list_files);
        assert_eq!(engine_config.stability.threshold, Duration::from_millis(300));
        assert_eq!(engine_config.debounce, BACKEND_DEBOUNCE);
    }

    #[test]
    fn test_invalid_rules_fail_construction() {
        let bus = EventBus::default();
        let mut config = EngineConfig::from_config(
            &Config::default(),
            WatchRoot {
                path: PathBuf::from("/srv"),
                configured: true,
            },
        );
        config.ignore_regex = vec!["(".to_string()];
        assert!(WatchEngine::new(config, bus).is_err());
    }

    #[tokio::test]
    async fn test_emit_present_adds_then_modifies() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.css"), "a {}").unwrap();
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut engine = engine_for(tmp.path(), &bus);

        engine.emit_present(Path::new("a.css")).await;
        engine.emit_present(Path::new("a.css")).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "file-added");
        assert_eq!(events[1].name(), "file-modified");
        assert_eq!(events[0].record().unwrap().relative_path, "a.css");
    }

    #[tokio::test]
    async fn test_emit_present_skips_missing_file() {
        let tmp = TempDir::new().unwrap();
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut engine = engine_for(tmp.path(), &bus);

        engine.emit_present(Path::new("ghost.css")).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_vanished_directory_deletes_known_children() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/a.css"), "a {}").unwrap();
        fs::write(tmp.path().join("sub/b.css"), "b {}").unwrap();
        fs::write(tmp.path().join("top.css"), "t {}").unwrap();

        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut engine = engine_for(tmp.path(), &bus);
        for rel in ["sub/a.css", "sub/b.css", "top.css"] {
            engine.emit_present(Path::new(rel)).await;
        }
        drain(&mut rx);

        engine.on_vanished(Path::new("sub"));
        let deleted: Vec<_> = drain(&mut rx)
            .into_iter()
            .map(|e| {
                assert_eq!(e.name(), "file-deleted");
                e.record().unwrap().relative_path.clone()
            })
            .collect();
        assert_eq!(deleted, vec!["sub/a.css".to_string(), "sub/b.css".to_string()]);
        assert!(engine.known.contains(Path::new("top.css")));
    }

    #[test]
    fn test_vanished_unknown_path_is_silent() {
        let tmp = TempDir::new().unwrap();
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut engine = engine_for(tmp.path(), &bus);

        engine.on_vanished(Path::new("never-seen.css"));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_stale_settled_report_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.css"), "a {}").unwrap();
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut engine = engine_for(tmp.path(), &bus);

        engine
            .on_settled(Settled {
                relative: PathBuf::from("a.css"),
                generation: 42,
                size: Some(4),
            })
            .await;
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_relative_strips_root() {
        let tmp = TempDir::new().unwrap();
        let bus = EventBus::default();
        let engine = engine_for(tmp.path(), &bus);

        assert_eq!(
            engine.relative(&tmp.path().join("x/y.css")),
            Some(PathBuf::from("x/y.css"))
        );
        assert_eq!(engine.relative(Path::new("/elsewhere/y.css")), None);
    }
}
