//! Path selection: gitignore-style matchers and the extension allow-list.
//!
//! Two independent [`PathMatcher`]s are consulted per file. The ignore
//! matcher drops a file from the synopsis entirely, the summary matcher
//! switches it to the condensed statistical rendering.

use crate::error::{Error, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the root-level ignore file.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

static DEFAULT_TEXT_EXTENSIONS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        ".txt", ".md", ".go", ".json", ".yaml", ".yml", ".xml", ".html", ".css", ".js", ".sh",
        ".conf", ".toml",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
});

/// Case-insensitive set of allowed file extensions.
///
/// Entries are stored dot-prefixed and lowercase (`".md"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: BTreeSet<String>,
}

impl ExtensionSet {
    /// Builds a set from extensions with or without the leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .filter_map(|ext| {
                let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
                (!ext.is_empty()).then(|| format!(".{ext}"))
            })
            .collect();

        Self { extensions }
    }

    /// Returns true if the lowercased extension of `path` is allowed.
    ///
    /// The extension is everything from the last `.` of the file name, so a
    /// dotfile such as `.conf` counts as having the extension `.conf`.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rfind('.').map(|dot| &name[dot..]))
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    /// Returns true if no extension is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Iterates the normalized extensions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_TEXT_EXTENSIONS.clone(),
        }
    }
}

/// Gitignore-style matcher over paths relative to the traversal root.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    matcher: Gitignore,
    pattern_count: usize,
}

impl PathMatcher {
    /// Builds the ignore matcher: `{root}/.gitignore` (when present) followed
    /// by `extra` patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing ignore file cannot be read or any
    /// pattern fails to parse.
    pub fn load_ignore(root: &Path, extra: &[String]) -> Result<Self> {
        let ignore_file = root.join(IGNORE_FILE_NAME);
        let mut patterns = Vec::new();

        if ignore_file.exists() {
            let content =
                fs::read_to_string(&ignore_file).map_err(|e| Error::io(&ignore_file, e))?;
            patterns.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
            debug!(
                "Loaded {} patterns from {}",
                patterns.len(),
                ignore_file.display()
            );
        }

        patterns.extend(extra.iter().cloned());
        Self::from_patterns(root, &patterns)
    }

    /// Builds a matcher from an explicit pattern list.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern fails to parse.
    pub fn from_patterns(root: &Path, patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::empty());
        }

        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder
                .add_line(None::<PathBuf>, pattern)
                .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
        }

        let matcher = builder
            .build()
            .map_err(|e| Error::invalid_pattern(patterns.join(","), e.to_string()))?;

        Ok(Self {
            matcher,
            pattern_count: patterns.len(),
        })
    }

    /// A matcher that matches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
            pattern_count: 0,
        }
    }

    /// Returns true if the file at `relative_path`, or one of its parent
    /// directories, is selected by the patterns.
    #[must_use]
    pub fn matches(&self, relative_path: &Path) -> bool {
        self.pattern_count > 0
            && self
                .matcher
                .matched_path_or_any_parents(relative_path, false)
                .is_ignore()
    }

    /// Returns true if the directory at `relative_path` itself is selected.
    #[must_use]
    pub fn matches_dir(&self, relative_path: &Path) -> bool {
        self.pattern_count > 0 && self.matcher.matched(relative_path, true).is_ignore()
    }

    /// Number of patterns the matcher was built from.
    #[must_use]
    pub const fn pattern_count(&self) -> usize {
        self.pattern_count
    }
}
