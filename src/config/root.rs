//! Watch root resolution.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

use super::file::RootArg;

/// Resolved watch root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoot {
    /// Absolute directory path.
    pub path: PathBuf,
    /// The operator named this folder explicitly.
    pub configured: bool,
}

/// Resolve the folder to watch.
///
/// With no root the current working directory is used and `configured` is
/// false. A root that is a symbolic link while symlinks are disallowed is
/// accepted with a warning.
///
/// # Errors
///
/// Returns a configuration error if the root is not a path, does not exist,
/// or is not a directory.
pub fn resolve_root(root: Option<&RootArg>, allow_symlinks: bool) -> Result<WatchRoot> {
    let cwd = std::env::current_dir()?;
    resolve_root_from(&cwd, root, allow_symlinks)
}

/// Resolve the folder to watch relative to `base` instead of the working directory.
///
/// # Errors
///
/// Same as [`resolve_root`].
pub fn resolve_root_from(
    base: &Path,
    root: Option<&RootArg>,
    allow_symlinks: bool,
) -> Result<WatchRoot> {
    let requested = match root {
        None => {
            return Ok(WatchRoot {
                path: base.to_path_buf(),
                configured: false,
            })
        }
        Some(RootArg::Invalid(kind)) => {
            return Err(Error::config(format!(
                "root needs to be an absolute or relative path, got a {kind}"
            )))
        }
        Some(RootArg::Path(p)) => p,
    };

    let resolved = normalize(&base.join(requested));

    let meta = std::fs::metadata(&resolved).map_err(|e| {
        Error::config(format!("unable to access {}: {e}", resolved.display()))
    })?;
    if !meta.is_dir() {
        return Err(Error::config(format!(
            "{} needs to be a directory",
            resolved.display()
        )));
    }

    if is_symlink(&resolved) && !allow_symlinks {
        tracing::warn!(
            root = %resolved.display(),
            "The root folder is a symbolic link. For better experience, try starting live-css with --allow-symlinks"
        );
    }

    Ok(WatchRoot {
        path: resolved,
        configured: true,
    })
}

/// Drop `.` and fold `..` segments without touching the filesystem, so a
/// symlinked root keeps its own name.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}
