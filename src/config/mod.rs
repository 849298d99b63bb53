//! Configuration management for live-css.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - `.live-css.toml` in the working directory (lowest priority)

mod file;
mod root;
mod settings;

pub use file::{load_from_dir, write_example, FileConfig, RootArg, CONFIG_FILE_NAME};
pub use root::{resolve_root, resolve_root_from, WatchRoot};
pub use settings::{Config, DEFAULT_PORT, DEFAULT_WATCH_RULES};
