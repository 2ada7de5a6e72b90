//! The immutable facts about one push
//!
//! A `PushContext` is built fresh for every push by the event layer (or read
//! from a JSON document by the CLI), lent to rule tables by shared reference
//! for the duration of one evaluation, and then dropped.

use crate::error::PushRulesError;
use crate::push::snapshot::ProjectSnapshot;
use crate::types::{Commit, RepoRef, Visibility};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_branch_name() -> String {
    "master".to_string()
}

/// Event-derived facts a push test may read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushContext {
    /// Repository the push went to
    pub repo: RepoRef,

    /// Repository visibility
    #[serde(default)]
    pub visibility: Visibility,

    /// Branch that was pushed
    pub branch: String,

    /// Default branch of the repository
    #[serde(default = "default_branch_name")]
    pub default_branch: String,

    /// Commits in the push, oldest first
    #[serde(default)]
    pub commits: Vec<Commit>,

    /// Whether deployment has been enabled for this repository
    #[serde(default)]
    pub deploy_enabled: bool,

    /// Paths changed by the push; `None` when the change set is unknown
    #[serde(default)]
    pub changed_files: Option<Vec<String>>,

    /// Repository content at the pushed commit
    #[serde(default)]
    pub project: ProjectSnapshot,
}

impl PushContext {
    /// Creates a context for a push to `branch` of `repo`
    ///
    /// Everything else starts at its default: private repository, default
    /// branch `master`, no commits, deploy disabled, unknown change set, empty
    /// project.
    pub fn new(repo: RepoRef, branch: impl Into<String>) -> Self {
        Self {
            repo,
            visibility: Visibility::default(),
            branch: branch.into(),
            default_branch: default_branch_name(),
            commits: Vec::new(),
            deploy_enabled: false,
            changed_files: None,
            project: ProjectSnapshot::default(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn with_commit(mut self, commit: Commit) -> Self {
        self.commits.push(commit);
        self
    }

    pub fn with_deploy_enabled(mut self, enabled: bool) -> Self {
        self.deploy_enabled = enabled;
        self
    }

    pub fn with_changed_files<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changed_files = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_project(mut self, project: ProjectSnapshot) -> Self {
        self.project = project;
        self
    }

    /// Returns true if the push went to the repository's default branch
    pub fn is_default_branch(&self) -> bool {
        self.branch == self.default_branch
    }

    /// The most recent commit of the push
    pub fn head_commit(&self) -> Option<&Commit> {
        self.commits.last()
    }

    /// Parses a push document
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Loads a push document from a file
    ///
    /// # Errors
    ///
    /// Returns `PushRulesError::Io` if the file cannot be read and
    /// `PushRulesError::Push` if it is not a valid push document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PushRulesError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| PushRulesError::Push {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PUSH_JSON: &str = r#"{
        "repo": {"owner": "atomist", "name": "spring-rest-seed"},
        "visibility": "public",
        "branch": "master",
        "commits": [
            {"sha": "a1", "message": "Initial commit"},
            {"sha": "b2", "message": "Add endpoint", "author": "rod"}
        ],
        "deploy_enabled": true,
        "changed_files": ["src/main/java/App.java"],
        "project": {"files": ["pom.xml", "src/main/java/App.java"]}
    }"#;

    #[test]
    fn test_parse_push_document() {
        let ctx = PushContext::from_json(PUSH_JSON).unwrap();

        assert_eq!(ctx.repo.slug(), "atomist/spring-rest-seed");
        assert_eq!(ctx.visibility, Visibility::Public);
        assert_eq!(ctx.default_branch, "master");
        assert!(ctx.is_default_branch());
        assert!(ctx.deploy_enabled);
        assert_eq!(ctx.head_commit().map(|c| c.sha.as_str()), Some("b2"));
        assert_eq!(ctx.changed_files.as_ref().map(Vec::len), Some(1));
        assert!(ctx.project.has_file("pom.xml"));
    }

    #[test]
    fn test_minimal_push_document_defaults() {
        let ctx = PushContext::from_json(
            r#"{"repo": {"owner": "o", "name": "r"}, "branch": "feature/x"}"#,
        )
        .unwrap();

        assert_eq!(ctx.visibility, Visibility::Private);
        assert!(!ctx.is_default_branch());
        assert!(ctx.changed_files.is_none());
        assert!(ctx.project.is_empty());
        assert!(ctx.head_commit().is_none());
    }

    #[test]
    fn test_builder_methods() {
        let ctx = PushContext::new(RepoRef::new("o", "r"), "main")
            .with_default_branch("main")
            .with_visibility(Visibility::Public)
            .with_deploy_enabled(true)
            .with_changed_files(["README.md"]);

        assert!(ctx.is_default_branch());
        assert_eq!(ctx.changed_files, Some(vec!["README.md".to_string()]));
    }

    #[test]
    fn test_load_invalid_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("push.json");
        fs::write(&path, "{ not json").unwrap();

        match PushContext::load(&path) {
            Err(PushRulesError::Push { file, .. }) => assert_eq!(file, path),
            other => panic!("expected push error, got {:?}", other),
        }
    }
}
