//! Error types and Result aliases for live-css.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using live-css's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for live-css operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Server error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// The OS ran out of watch handles or file descriptors.
    #[error("out of file watch resources: {0}")]
    ResourceExhausted(String),

    /// The OS watcher stopped delivering events.
    #[error("watch backend stopped: {0}")]
    BackendClosed(String),
}

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Every port from the starting port upward is taken.
    #[error("no free port available starting from {start}")]
    NoFreePort { start: u16 },

    /// Serving connections failed.
    #[error("serve error: {0}")]
    Serve(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Operator guidance printed under the error heading before exiting.
    #[must_use]
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::Watcher(WatcherError::ResourceExhausted(_)) => Some(
                "Most probably, this issue can be easily fixed. Try one of the following and run live-css again:\n\
                 \x20   1. On Linux, raise the inotify limit: sysctl fs.inotify.max_user_watches=524288\n\
                 \x20   2. You are probably watching too many files:\n\
                 \x20      - try a narrower --root directory\n\
                 \x20      - try narrower \"watch-rules\" in .live-css.toml\n\
                 \x20      - try more \"watch-ignore-rules\" in .live-css.toml\n\
                 \x20   3. You may be running out of disk space. Free some space and try again",
            ),
            Self::Server(ServerError::NoFreePort { .. } | ServerError::BindFailed { .. }) => {
                Some("The requested port number is in use. Pass a different port number with --port.")
            }
            Self::Config(_) => Some("Run live-css --help to see the available options."),
            _ => None,
        }
    }
}

impl WatcherError {
    /// Classify a notify error, separating resource exhaustion from other failures.
    pub fn from_notify(path: &std::path::Path, err: &notify::Error) -> Self {
        let exhausted = match &err.kind {
            notify::ErrorKind::MaxFilesWatch => true,
            notify::ErrorKind::Io(io) => is_exhaustion(io),
            _ => false,
        };

        if exhausted {
            Self::ResourceExhausted(err.to_string())
        } else {
            Self::WatchFailed {
                path: path.display().to_string(),
                reason: err.to_string(),
            }
        }
    }
}

/// ENOSPC from inotify or EMFILE/ENFILE from the process.
fn is_exhaustion(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(23 | 24 | 28))
}

#[cfg(test)]
mod tests;
