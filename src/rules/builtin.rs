#![forbid(unsafe_code)]

//! Built-in push tests
//!
//! These are the tests delivery machines are usually wired from: build-tool
//! detection from marker files, branch and visibility checks, deployment
//! switches and material-change detection.

use crate::error::{ConfigError, PredicateError};
use crate::push::PushContext;
use crate::push::snapshot::build_globset;
use crate::rules::predicate::{PredicateFn, PushTest, simple_push_test};
use crate::types::Visibility;
use globset::GlobSet;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};

/// Commit message marker left by automation-generated commits
const AUTOMATION_MARKER: &str = "[atomist]";

static SPRING_BOOT_APPLICATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@SpringBootApplication\b").expect("spring boot annotation pattern is valid")
});

static JAVA_SOURCES: LazyLock<GlobSet> = LazyLock::new(|| {
    build_globset(&["**/*.java".to_string()]).expect("java source pattern is valid")
});

static JAVA_MAIN_SOURCES: LazyLock<GlobSet> = LazyLock::new(|| {
    build_globset(&["**/src/main/java/**/*.java".to_string()])
        .expect("java main source pattern is valid")
});

/// True when the project contains a specific file
struct HasFile {
    name: String,
    path: String,
}

impl PushTest for HasFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        Ok(ctx.project.has_file(&self.path))
    }
}

fn named_has_file(name: &str, path: &str) -> PredicateFn {
    Arc::new(HasFile {
        name: name.to_string(),
        path: path.to_string(),
    })
}

/// True when any project file matches a glob
struct HasFileMatching {
    name: String,
    set: GlobSet,
}

impl PushTest for HasFileMatching {
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        Ok(ctx.project.files_matching(&self.set).next().is_some())
    }
}

fn compile_glob(name: String, pattern: &str) -> Result<PredicateFn, ConfigError> {
    let set = build_globset(&[pattern.to_string()]).map_err(|e| ConfigError::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(HasFileMatching { name, set }))
}

/// True when a Java source under `src/main/java` is annotated as a Spring Boot application
struct HasSpringBootApplicationClass {
    sources: GlobSet,
}

impl PushTest for HasSpringBootApplicationClass {
    fn name(&self) -> &str {
        "has-spring-boot-application-class"
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        for path in ctx.project.files_matching(&self.sources) {
            let content = ctx.project.read_file(path)?;
            if SPRING_BOOT_APPLICATION.is_match(&content) {
                tracing::trace!(path, "found Spring Boot application class");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// True when the push changed files relevant to a stack
///
/// An unknown change set counts as material.
struct MaterialChange {
    name: &'static str,
    extensions: &'static [&'static str],
    files: &'static [&'static str],
}

impl MaterialChange {
    fn is_material(&self, changed: &str) -> bool {
        let path = Path::new(changed);
        let file_name = path.file_name().and_then(|f| f.to_str()).unwrap_or("");
        if self.files.contains(&file_name) {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

impl PushTest for MaterialChange {
    fn name(&self) -> &str {
        self.name
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        match &ctx.changed_files {
            None => Ok(true),
            Some(changed) => Ok(changed.iter().any(|path| self.is_material(path))),
        }
    }
}

/// True when the pushed branch matches a regex
struct BranchMatches {
    name: String,
    regex: Regex,
}

impl PushTest for BranchMatches {
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        Ok(self.regex.is_match(&ctx.branch))
    }
}

/// Project has a file at `path`
pub fn has_file(path: &str) -> PredicateFn {
    named_has_file(&format!("has-file:{}", path), path)
}

/// Project has a file matching `pattern`
///
/// # Errors
///
/// Returns `ConfigError::InvalidGlob` if the pattern does not compile.
pub fn has_file_matching(pattern: &str) -> Result<PredicateFn, ConfigError> {
    compile_glob(format!("has-file-matching:{}", pattern), pattern)
}

/// Pushed branch matches `pattern`
///
/// # Errors
///
/// Returns `ConfigError::InvalidRegex` if the pattern does not compile.
pub fn branch_matches(pattern: &str) -> Result<PredicateFn, ConfigError> {
    let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(BranchMatches {
        name: format!("branch-matches:{}", pattern),
        regex,
    }))
}

pub fn is_maven() -> PredicateFn {
    named_has_file("is-maven", "pom.xml")
}

pub fn is_node() -> PredicateFn {
    named_has_file("is-node", "package.json")
}

pub fn is_lein() -> PredicateFn {
    named_has_file("is-lein", "project.clj")
}

pub fn is_java() -> PredicateFn {
    Arc::new(HasFileMatching {
        name: "is-java".to_string(),
        set: JAVA_SOURCES.clone(),
    })
}

pub fn has_dockerfile() -> PredicateFn {
    named_has_file("has-dockerfile", "Dockerfile")
}

pub fn has_travis_file() -> PredicateFn {
    named_has_file("has-travis-file", ".travis.yml")
}

pub fn has_cloud_foundry_manifest() -> PredicateFn {
    named_has_file("has-cloud-foundry-manifest", "manifest.yml")
}

pub fn has_k8s_spec() -> PredicateFn {
    named_has_file("has-k8s-spec", ".atomist/kubernetes/deployment.json")
}

pub fn has_atomist_build_file() -> PredicateFn {
    named_has_file("has-atomist-build-file", ".atomist/build.sh")
}

pub fn has_spring_boot_application_class() -> PredicateFn {
    Arc::new(HasSpringBootApplicationClass {
        sources: JAVA_MAIN_SOURCES.clone(),
    })
}

pub fn to_default_branch() -> PredicateFn {
    simple_push_test("to-default-branch", PushContext::is_default_branch)
}

pub fn to_public_repo() -> PredicateFn {
    simple_push_test("to-public-repo", |ctx| ctx.visibility == Visibility::Public)
}

/// Head commit was generated by automation
pub fn from_atomist() -> PredicateFn {
    simple_push_test("from-atomist", |ctx| {
        ctx.head_commit()
            .is_some_and(|c| c.message.contains(AUTOMATION_MARKER))
    })
}

pub fn is_deploy_enabled() -> PredicateFn {
    simple_push_test("is-deploy-enabled", |ctx| ctx.deploy_enabled)
}

/// Repository is a seed for project generation
pub fn named_seed_repo() -> PredicateFn {
    simple_push_test("named-seed-repo", |ctx| ctx.repo.name.contains("-seed"))
}

pub fn material_change_to_java_repo() -> PredicateFn {
    Arc::new(MaterialChange {
        name: "material-change-to-java-repo",
        extensions: &["java", "html", "json", "yml", "xml", "sh", "kt", "properties"],
        files: &["Dockerfile"],
    })
}

pub fn material_change_to_node_repo() -> PredicateFn {
    Arc::new(MaterialChange {
        name: "material-change-to-node-repo",
        extensions: &["ts", "tsx", "js", "jsx", "json", "html", "css", "pug"],
        files: &["Dockerfile"],
    })
}

/// Matches every push
pub fn any_push() -> PredicateFn {
    simple_push_test("any-push", |_| true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::ProjectSnapshot;
    use crate::types::{Commit, RepoRef};

    fn push_with_files(files: &[&str]) -> PushContext {
        PushContext::new(RepoRef::new("o", "r"), "master")
            .with_project(ProjectSnapshot::new().with_files(files.iter().copied()))
    }

    #[test]
    fn test_build_tool_detection() {
        let maven = push_with_files(&["pom.xml"]);
        let node = push_with_files(&["package.json"]);
        let lein = push_with_files(&["project.clj"]);

        assert!(is_maven().test(&maven).unwrap());
        assert!(!is_maven().test(&node).unwrap());
        assert!(is_node().test(&node).unwrap());
        assert!(is_lein().test(&lein).unwrap());
        assert!(!is_lein().test(&maven).unwrap());
    }

    #[test]
    fn test_is_java() {
        assert!(is_java().test(&push_with_files(&["src/main/java/a/B.java"])).unwrap());
        assert!(!is_java().test(&push_with_files(&["pom.xml"])).unwrap());
    }

    #[test]
    fn test_marker_files() {
        let ctx = push_with_files(&[
            "Dockerfile",
            ".travis.yml",
            "manifest.yml",
            ".atomist/kubernetes/deployment.json",
            ".atomist/build.sh",
        ]);
        assert!(has_dockerfile().test(&ctx).unwrap());
        assert!(has_travis_file().test(&ctx).unwrap());
        assert!(has_cloud_foundry_manifest().test(&ctx).unwrap());
        assert!(has_k8s_spec().test(&ctx).unwrap());
        assert!(has_atomist_build_file().test(&ctx).unwrap());

        let empty = push_with_files(&[]);
        assert!(!has_dockerfile().test(&empty).unwrap());
        assert!(!has_k8s_spec().test(&empty).unwrap());
    }

    #[test]
    fn test_spring_boot_application_class() {
        let ctx = PushContext::new(RepoRef::new("o", "r"), "master").with_project(
            ProjectSnapshot::new()
                .with_content("pom.xml", "<project/>")
                .with_content(
                    "src/main/java/com/example/App.java",
                    "@SpringBootApplication\npublic class App {}",
                ),
        );
        assert!(has_spring_boot_application_class().test(&ctx).unwrap());

        let plain = PushContext::new(RepoRef::new("o", "r"), "master").with_project(
            ProjectSnapshot::new().with_content("src/main/java/Lib.java", "public class Lib {}"),
        );
        assert!(!has_spring_boot_application_class().test(&plain).unwrap());
    }

    #[test]
    fn test_spring_boot_ignores_test_sources() {
        let ctx = PushContext::new(RepoRef::new("o", "r"), "master").with_project(
            ProjectSnapshot::new().with_content(
                "src/test/java/AppTest.java",
                "@SpringBootApplication class TestApp {}",
            ),
        );
        assert!(!has_spring_boot_application_class().test(&ctx).unwrap());
    }

    #[test]
    fn test_spring_boot_propagates_unreadable_content() {
        let ctx = push_with_files(&["src/main/java/App.java"]);
        let err = has_spring_boot_application_class().test(&ctx).unwrap_err();
        assert!(matches!(err, PredicateError::ContentUnavailable(_)));
    }

    #[test]
    fn test_branch_and_visibility() {
        let ctx = PushContext::new(RepoRef::new("o", "r"), "master")
            .with_visibility(Visibility::Public);
        assert!(to_default_branch().test(&ctx).unwrap());
        assert!(to_public_repo().test(&ctx).unwrap());

        let feature = PushContext::new(RepoRef::new("o", "r"), "feature/login");
        assert!(!to_default_branch().test(&feature).unwrap());
        assert!(!to_public_repo().test(&feature).unwrap());
    }

    #[test]
    fn test_from_atomist_uses_head_commit() {
        let generated = PushContext::new(RepoRef::new("o", "r"), "master")
            .with_commit(Commit {
                sha: "1".into(),
                message: "Manual change".into(),
                author: None,
            })
            .with_commit(Commit {
                sha: "2".into(),
                message: "Autofix: license header [atomist]".into(),
                author: None,
            });
        assert!(from_atomist().test(&generated).unwrap());

        let manual = PushContext::new(RepoRef::new("o", "r"), "master");
        assert!(!from_atomist().test(&manual).unwrap());
    }

    #[test]
    fn test_named_seed_repo() {
        let seed = PushContext::new(RepoRef::new("atomist", "spring-rest-seed"), "master");
        let app = PushContext::new(RepoRef::new("atomist", "billing"), "master");
        assert!(named_seed_repo().test(&seed).unwrap());
        assert!(!named_seed_repo().test(&app).unwrap());
    }

    #[test]
    fn test_material_change_to_java() {
        let base = PushContext::new(RepoRef::new("o", "r"), "master");
        let test = material_change_to_java_repo();

        assert!(test.test(&base).unwrap(), "unknown change set is material");
        assert!(
            test.test(&base.clone().with_changed_files(["src/main/java/App.java"]))
                .unwrap()
        );
        assert!(test.test(&base.clone().with_changed_files(["Dockerfile"])).unwrap());
        assert!(!test.test(&base.clone().with_changed_files(["README.md"])).unwrap());
        assert!(
            !test
                .test(&base.clone().with_changed_files(Vec::<String>::new()))
                .unwrap()
        );
    }

    #[test]
    fn test_material_change_to_node() {
        let base = PushContext::new(RepoRef::new("o", "r"), "master");
        let test = material_change_to_node_repo();

        assert!(test.test(&base.clone().with_changed_files(["src/index.ts"])).unwrap());
        assert!(!test.test(&base.clone().with_changed_files(["docs/guide.md"])).unwrap());
    }

    #[test]
    fn test_has_file_matching() {
        let test = has_file_matching("**/*.yml").unwrap();
        assert_eq!(test.name(), "has-file-matching:**/*.yml");
        assert!(test.test(&push_with_files(&["config/app.yml"])).unwrap());
        assert!(!test.test(&push_with_files(&["config/app.toml"])).unwrap());
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        assert!(matches!(
            has_file_matching("src/[unclosed"),
            Err(ConfigError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn test_branch_matches() {
        let release = branch_matches(r"^release/\d+").unwrap();
        let ctx = PushContext::new(RepoRef::new("o", "r"), "release/42");
        assert!(release.test(&ctx).unwrap());
        assert!(!release.test(&PushContext::new(RepoRef::new("o", "r"), "master")).unwrap());
        assert!(matches!(
            branch_matches("(unclosed"),
            Err(ConfigError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_any_push() {
        assert!(any_push().test(&push_with_files(&[])).unwrap());
    }
}
