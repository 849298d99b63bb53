//! Configuration settings and validation.

use std::time::Duration;

use crate::{Error, Result};

use super::file::{FileConfig, RootArg};

/// Port used when the operator did not ask for one.
pub const DEFAULT_PORT: u16 = 3456;

/// Watch rule used when none are configured.
pub const DEFAULT_WATCH_RULES: &[&str] = &["**/*.css"];

/// Main configuration for the live-css server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Folder containing the files to monitor. `None` means the working
    /// directory with file-name-only matching on the client side.
    pub root: Option<RootArg>,

    /// Glob rules selecting files to watch.
    pub watch_rules: Vec<String>,

    /// Gitignore-style rules excluding paths. `!rule` re-includes.
    pub ignore_rules: Vec<String>,

    /// Regular expressions excluding paths, matched against the relative path.
    pub ignore_regex: Vec<String>,

    /// Follow symbolic links while scanning and watching.
    pub allow_symlinks: bool,

    /// Port requested by the operator.
    pub port: Option<u16>,

    /// Host address to bind to.
    pub host: String,

    /// Log every watched file as the initial scan finds it.
    pub list_files: bool,

    /// Log the watched file list under a header.
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON logging output.
    pub log_json: bool,

    /// Dump configuration and watch rules at startup.
    pub debug: bool,

    /// How long a file size must stay unchanged before a write counts as finished.
    pub stability_threshold: Duration,

    /// How often file sizes are sampled while waiting for stability.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            watch_rules: DEFAULT_WATCH_RULES.iter().map(ToString::to_string).collect(),
            ignore_rules: Vec::new(),
            ignore_regex: Vec::new(),
            allow_symlinks: false,
            port: None,
            host: "0.0.0.0".to_string(),
            list_files: false,
            verbose: false,
            log_level: "info".to_string(),
            log_json: false,
            debug: false,
            stability_threshold: Duration::from_millis(100),
            poll_interval: Duration::from_millis(45),
        }
    }
}

impl Config {
    /// Layer values from a config file underneath the current ones.
    ///
    /// Values already set (from the command line) win over the file.
    pub fn merge_file(&mut self, file: FileConfig) {
        if self.root.is_none() {
            self.root = file.root.map(RootArg::from);
        }
        if self.port.is_none() {
            self.port = file.port.and_then(|port| match u16::try_from(port) {
                Ok(port) if port >= 1 => Some(port),
                _ => {
                    tracing::warn!(port, "Ignoring out-of-range port from configuration file");
                    None
                }
            });
        }
        if let Some(rules) = file.watch_rules {
            self.watch_rules = rules;
        }
        self.ignore_rules.extend(file.watch_ignore_rules);
        self.ignore_regex.extend(file.watch_ignore_regex);
        self.allow_symlinks |= file.allow_symlinks;
        if let Some(ms) = file.stability_threshold_ms {
            self.stability_threshold = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.watch_rules.iter().all(|r| r.trim().is_empty()) {
            return Err(Error::config("at least one watch rule is required"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::config("poll interval cannot be 0"));
        }

        if self.poll_interval > self.stability_threshold {
            return Err(Error::config(
                "poll interval cannot exceed the stability threshold",
            ));
        }

        if self.port == Some(0) {
            return Err(Error::config("port cannot be 0"));
        }

        if self.host.is_empty() {
            return Err(Error::config("host cannot be empty"));
        }

        for pattern in &self.ignore_regex {
            regex::Regex::new(pattern)
                .map_err(|e| Error::config(format!("invalid ignore regex '{pattern}': {e}")))?;
        }

        Ok(())
    }
}
