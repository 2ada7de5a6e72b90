//! Project snapshots with gitignore-aware discovery
//!
//! A snapshot is the view push tests get of the repository at the pushed
//! commit: the set of repository-relative paths, plus file content either
//! inlined (documents and tests) or read from a checkout on disk.

use crate::error::{PredicateError, SnapshotError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Patterns that are never part of a snapshot
const ALWAYS_EXCLUDED: &[&str] = &["**/.git/**", ".git/**"];

/// Files of a repository at the pushed commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotDocument")]
pub struct ProjectSnapshot {
    /// Checkout directory, if content can be read from disk
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<PathBuf>,

    /// Repository-relative paths, forward slashes
    files: BTreeSet<String>,

    /// Inline file content keyed by relative path
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    contents: BTreeMap<String, String>,
}

impl ProjectSnapshot {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path without content
    pub fn with_file(mut self, path: impl AsRef<str>) -> Self {
        self.files.insert(normalize(path.as_ref()));
        self
    }

    /// Adds several paths without content
    pub fn with_files<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.files.insert(normalize(path.as_ref()));
        }
        self
    }

    /// Adds a path with inline content
    pub fn with_content(mut self, path: impl AsRef<str>, content: impl Into<String>) -> Self {
        let path = normalize(path.as_ref());
        self.files.insert(path.clone());
        self.contents.insert(path, content.into());
        self
    }

    /// Sets the checkout directory content is read from
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Snapshots a checkout directory
    ///
    /// Walks `root` honouring `.gitignore`, skipping the `.git` directory and
    /// anything matching `exclude`. Hidden files are kept since many push tests
    /// look for dotfiles (`.travis.yml`, `.atomist/build.sh`).
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the root does not exist, an exclude pattern is
    /// invalid, or the walk fails.
    pub fn from_dir(root: &Path, exclude: &[String]) -> Result<Self, SnapshotError> {
        if !root.is_dir() {
            return Err(SnapshotError::MissingRoot(root.to_path_buf()));
        }

        let mut patterns: Vec<String> = ALWAYS_EXCLUDED.iter().map(|p| p.to_string()).collect();
        patterns.extend(exclude.iter().cloned());
        let exclude_set = build_globset(&patterns)?;

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .build();

        let mut files = BTreeSet::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let relative = match entry.path().strip_prefix(root) {
                Ok(relative) => relative,
                Err(_) => {
                    tracing::warn!(path = %entry.path().display(), "entry outside checkout root");
                    continue;
                }
            };
            let relative = normalize(&relative.to_string_lossy());

            if exclude_set.is_match(&relative) {
                continue;
            }
            files.insert(relative);
        }

        tracing::debug!(root = %root.display(), files = files.len(), "snapshotted checkout");

        Ok(Self {
            root: Some(root.to_path_buf()),
            files,
            contents: BTreeMap::new(),
        })
    }

    /// Checkout directory, if any
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Returns true if the snapshot contains `path`
    pub fn has_file(&self, path: &str) -> bool {
        let path = normalize(path);
        self.files.contains(&path) || self.contents.contains_key(&path)
    }

    /// All paths in the snapshot, sorted
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Paths matching any glob of `set`, sorted
    pub fn files_matching<'a>(&'a self, set: &'a GlobSet) -> impl Iterator<Item = &'a str> {
        self.files().filter(move |path| set.is_match(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Reads the content of `path`
    ///
    /// Inline content wins over the checkout.
    ///
    /// # Errors
    ///
    /// `PredicateError::Io` if reading the checkout fails,
    /// `PredicateError::ContentUnavailable` if there is neither inline content
    /// nor a checkout.
    pub fn read_file(&self, path: &str) -> Result<String, PredicateError> {
        let path = normalize(path);
        if let Some(content) = self.contents.get(&path) {
            return Ok(content.clone());
        }

        match &self.root {
            Some(root) => {
                let full = root.join(&path);
                fs::read_to_string(&full)
                    .map_err(|source| PredicateError::Io { path: full, source })
            }
            None => Err(PredicateError::ContentUnavailable(path)),
        }
    }
}

/// Wire form of a snapshot; paths are normalized and inline content implies presence
#[derive(Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    root: Option<PathBuf>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    contents: BTreeMap<String, String>,
}

impl From<SnapshotDocument> for ProjectSnapshot {
    fn from(doc: SnapshotDocument) -> Self {
        let mut snapshot = ProjectSnapshot::new().with_files(&doc.files);
        for (path, content) in doc.contents {
            snapshot = snapshot.with_content(path, content);
        }
        snapshot.root = doc.root;
        snapshot
    }
}

/// Builds a globset from string patterns
pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet, SnapshotError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| SnapshotError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| SnapshotError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

/// Normalizes a relative path:
/// - backslashes become forward slashes
/// - a leading "./" or "/" is removed
fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let trimmed = path.trim_start_matches("./").trim_start_matches('/');
    trimmed.to_string()
}
