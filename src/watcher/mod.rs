//! File system watching.
//!
//! This module provides:
//! - Directory watching using notify-rs
//! - Gitignore-style watch and ignore rules
//! - Write-stability waiting before change notification
//! - Normalized change records for clients

mod backend;
mod engine;
mod filter;
mod record;
mod scanner;
mod stability;
pub mod symlink;

pub use backend::{FileWatcher, RawSignal, BACKEND_DEBOUNCE};
pub use engine::{EngineConfig, WatchEngine};
pub use filter::{PathMatcher, DEFAULT_IGNORE_RULES};
pub use record::ChangeRecord;
pub use scanner::scan_directory;
pub use stability::{wait_for_stable_size, StabilityConfig};
