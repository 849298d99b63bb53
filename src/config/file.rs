//! `.live-css.toml` loading and generation.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".live-css.toml";

/// Contents written by `live-css --init`.
pub const EXAMPLE_CONFIG: &str = r#"# live-css configuration
#
# Values passed on the command line take precedence over this file.

# Folder containing the files to monitor (absolute or relative).
# When omitted, the current folder is watched and files are matched by name only.
# root = "src/css"

# Port number to run the live-css server on.
# port = 3456

# Files to watch.
watch-rules = [
    "**/*.css",
    # "**/*.less",
    # "**/*.scss",
]

# Paths to skip, in .gitignore syntax. Prefix a rule with "!" to re-include
# a path whose parent folder is ignored.
watch-ignore-rules = [
    # "build/*",
    # "!build/output.css",
    # "!node_modules/some-package/dist/theme.css",
]

# Regular expressions matched against the path relative to the root.
watch-ignore-regex = []

# Follow symbolic links.
allow-symlinks = false

# Wait until a file size has been stable this long before notifying.
stability-threshold-ms = 100
poll-interval-ms = 45
"#;

/// Root folder as it arrived from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootArg {
    /// A path string.
    Path(PathBuf),
    /// A value of the wrong type, named by its type.
    Invalid(String),
}

impl From<toml::Value> for RootArg {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Self::Path(PathBuf::from(s)),
            other => Self::Invalid(other.type_str().to_string()),
        }
    }
}

/// Raw contents of `.live-css.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub root: Option<toml::Value>,
    pub port: Option<i64>,
    pub watch_rules: Option<Vec<String>>,
    #[serde(default)]
    pub watch_ignore_rules: Vec<String>,
    #[serde(default)]
    pub watch_ignore_regex: Vec<String>,
    #[serde(default)]
    pub allow_symlinks: bool,
    pub stability_threshold_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

/// Load the config file from `dir` if there is one.
///
/// # Errors
///
/// Returns a configuration error if the file exists but cannot be read or parsed.
pub fn load_from_dir(dir: &Path) -> Result<Option<(PathBuf, FileConfig)>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(&path).map_err(|e| {
        Error::config(format!("unable to read configuration from {}: {e}", path.display()))
    })?;
    let parsed: FileConfig = toml::from_str(&text).map_err(|e| {
        Error::config(format!(
            "unable to parse configuration from {}: {e}",
            path.display()
        ))
    })?;

    tracing::debug!(path = %path.display(), "Loaded configuration file");
    Ok(Some((path, parsed)))
}

/// Write the example config file into `dir`.
///
/// # Errors
///
/// Returns a configuration error if the file cannot be written.
pub fn write_example(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    std::fs::write(&path, EXAMPLE_CONFIG).map_err(|e| {
        Error::config(format!(
            "unable to write configuration file to {}: {e}",
            path.display()
        ))
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_example_config_parses() {
        let parsed: FileConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed.watch_rules, Some(vec!["**/*.css".to_string()]));
        assert!(parsed.root.is_none());
        assert!(!parsed.allow_symlinks);
        assert_eq!(parsed.poll_interval_ms, Some(45));
    }

    #[test]
    fn test_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_from_dir(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let tmp = TempDir::new().unwrap();
        let written = write_example(tmp.path()).unwrap();
        assert!(written.ends_with(CONFIG_FILE_NAME));

        let (path, _) = load_from_dir(tmp.path()).unwrap().unwrap();
        assert_eq!(path, written);
    }

    #[test]
    fn test_unparsable_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "watch-rules = [").unwrap();
        let err = load_from_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "colour = true").unwrap();
        assert!(load_from_dir(tmp.path()).is_err());
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let tmp = TempDir::new().unwrap();
        let err = write_example(&tmp.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("unable to write"));
    }

    #[test]
    fn test_non_string_root_is_invalid() {
        let parsed: FileConfig = toml::from_str("root = 42").unwrap();
        let root = parsed.root.map(RootArg::from);
        assert_eq!(root, Some(RootArg::Invalid("integer".to_string())));
    }
}
