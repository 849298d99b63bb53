//! Watch and ignore rule matching.
//!
//! Watch rules and ignore rules are both gitignore-syntax globs evaluated
//! against paths relative to the watch root. A path is watched when a watch
//! rule selects it and the ignore rules do not exclude it. Ignore rules are
//! applied in three layers, later layers winning:
//!
//! 1. built-in defaults (dot segments, `node_modules`)
//! 2. positive operator rules
//! 3. negated operator rules (`!path`), which re-admit paths

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use regex::Regex;

use crate::{Error, Result};

/// Rules ignored unless a negated rule re-admits the path.
pub const DEFAULT_IGNORE_RULES: &[&str] = &[".*", "node_modules"];

/// Decides which paths under the watch root are of interest.
#[derive(Debug)]
pub struct PathMatcher {
    watch: Gitignore,
    ignore: Gitignore,
    ignore_regex: Vec<Regex>,
    negations: Vec<String>,
}

impl PathMatcher {
    /// Build a matcher for `root`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any rule fails to compile.
    pub fn new(
        root: &Path,
        watch_rules: &[String],
        ignore_rules: &[String],
        ignore_regex: &[String],
    ) -> Result<Self> {
        let watch = build(root, watch_rules.iter().map(String::as_str))?;

        let (negated, positive): (Vec<&str>, Vec<&str>) = ignore_rules
            .iter()
            .map(String::as_str)
            .partition(|rule| rule.starts_with('!'));
        let layered = DEFAULT_IGNORE_RULES
            .iter()
            .copied()
            .chain(positive)
            .chain(negated.iter().copied());
        let ignore = build(root, layered)?;

        let ignore_regex = ignore_regex
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| Error::config(format!("invalid ignore regex '{p}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let negations = negated
            .iter()
            .map(|rule| rule.trim_start_matches('!').trim_start_matches('/').to_string())
            .collect();

        Ok(Self {
            watch,
            ignore,
            ignore_regex,
            negations,
        })
    }

    /// Whether a file at `relative` should produce events.
    #[must_use]
    pub fn is_watched(&self, relative: &Path) -> bool {
        self.matches_watch_rules(relative) && !self.is_ignored(relative, false)
    }

    /// Whether `relative` is selected by a watch rule, ignoring exclusions.
    #[must_use]
    pub fn matches_watch_rules(&self, relative: &Path) -> bool {
        !relative.as_os_str().is_empty()
            && self
                .watch
                .matched_path_or_any_parents(relative, false)
                .is_ignore()
    }

    /// Whether `relative` is excluded by the ignore rules.
    #[must_use]
    pub fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
        if relative.as_os_str().is_empty() {
            return false;
        }

        if self
            .ignore
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
        {
            return true;
        }

        let text = relative.to_string_lossy();
        self.ignore_regex.iter().any(|re| re.is_match(&text))
    }

    /// Whether a directory walk may skip everything below `relative`.
    ///
    /// An ignored directory still has to be descended into when a negated
    /// rule could re-admit something inside it.
    #[must_use]
    pub fn can_prune(&self, relative: &Path) -> bool {
        if !self.is_ignored(relative, true) {
            return false;
        }

        let prefix = format!("{}/", relative.to_string_lossy().replace('\\', "/"));
        !self.negations.iter().any(|rule| {
            rule.starts_with(&prefix) || rule.starts_with("**") || !rule.contains('/')
        })
    }
}

fn build<'a>(root: &Path, rules: impl IntoIterator<Item = &'a str>) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    for rule in rules {
        builder
            .add_line(None, rule)
            .map_err(|e| Error::config(format!("invalid pattern '{rule}': {e}")))?;
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("failed to build rule set: {e}")))
}
