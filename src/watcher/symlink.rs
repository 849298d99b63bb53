//! Symbolic link re-validation before emitting add/change events.
//!
//! Some watch backends report events for symbolic links (notably executable
//! links) even when link following is off. Every add/change goes through
//! [`admit`] before it is published. A backend without that defect can make
//! [`admit`] return `true` unconditionally; nothing else depends on it.

use std::path::Path;

use super::filter::PathMatcher;

/// Decide whether an add/change for `relative` may be emitted.
///
/// With links disallowed, the path is lstat'ed and dropped if it is a link.
/// An lstat failure means the file vanished, so the event is dropped too.
/// With links allowed, the path must still match the watch rules.
pub async fn admit(
    full: &Path,
    relative: &Path,
    allow_symlinks: bool,
    matcher: &PathMatcher,
) -> bool {
    if allow_symlinks {
        return matcher.matches_watch_rules(relative);
    }

    match tokio::fs::symlink_metadata(full).await {
        Ok(meta) => !meta.file_type().is_symlink(),
        Err(e) => {
            tracing::trace!(path = %full.display(), error = %e, "Path vanished before emit");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn css_matcher(root: &Path) -> PathMatcher {
        PathMatcher::new(root, &["**/*.css".to_string()], &[], &[]).unwrap()
    }

    #[tokio::test]
    async fn test_regular_file_is_admitted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.css"), "a {}").unwrap();
        let m = css_matcher(tmp.path());
        assert!(admit(&tmp.path().join("a.css"), Path::new("a.css"), false, &m).await);
    }

    #[tokio::test]
    async fn test_vanished_file_is_dropped() {
        let tmp = TempDir::new().unwrap();
        let m = css_matcher(tmp.path());
        assert!(!admit(&tmp.path().join("gone.css"), Path::new("gone.css"), false, &m).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_dropped_when_disallowed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("real.css"), "a {}").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("real.css"), tmp.path().join("link.css"))
            .unwrap();
        let m = css_matcher(tmp.path());

        assert!(!admit(&tmp.path().join("link.css"), Path::new("link.css"), false, &m).await);
        assert!(admit(&tmp.path().join("link.css"), Path::new("link.css"), true, &m).await);
    }

    #[tokio::test]
    async fn test_allowed_links_rechecked_against_watch_rules() {
        let tmp = TempDir::new().unwrap();
        let m = css_matcher(tmp.path());
        assert!(!admit(&tmp.path().join("run.sh"), Path::new("run.sh"), true, &m).await);
    }
}
