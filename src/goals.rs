#![forbid(unsafe_code)]

//! Goals, goal sets and goal-setting outcomes
//!
//! Goals are named units of work the surrounding delivery machine knows how to
//! execute. This crate never executes them; it only decides which set of goals
//! a push gets.

use crate::error::ConfigError;
use crate::types::Environment;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// A named unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Goal {
    key: &'static str,
    display_name: &'static str,
    environment: Environment,
}

impl Goal {
    const fn new(key: &'static str, display_name: &'static str, environment: Environment) -> Self {
        Self {
            key,
            display_name,
            environment,
        }
    }

    /// Stable kebab-case key, used in configuration and output
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns true for goals that produce a build
    pub fn is_build(&self) -> bool {
        matches!(self.key, "build" | "just-build")
    }

    /// Returns true for goals fulfilled by a deployer
    pub fn is_deployment(&self) -> bool {
        self.key.ends_with("-deploy") || self.key.ends_with("-undeploy")
    }

    /// Looks up a catalog goal by key
    pub fn from_key(key: &str) -> Option<Goal> {
        CATALOG.iter().copied().find(|goal| goal.key == key)
    }

    /// All catalog goals
    pub fn catalog() -> &'static [Goal] {
        CATALOG
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key)
    }
}

impl Serialize for Goal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key)
    }
}

pub const AUTOFIX: Goal = Goal::new("autofix", "Autofix", Environment::Code);
pub const REVIEW: Goal = Goal::new("review", "Code review", Environment::Code);
pub const CODE_REACTION: Goal = Goal::new("code-reaction", "React to code", Environment::Code);
pub const FINGERPRINT: Goal = Goal::new("fingerprint", "Fingerprint", Environment::Code);
pub const BUILD: Goal = Goal::new("build", "Build", Environment::Code);
pub const JUST_BUILD: Goal = Goal::new("just-build", "Build (no deploy)", Environment::Code);
pub const ARTIFACT: Goal = Goal::new("artifact", "Store artifact", Environment::Code);
pub const VERSION: Goal = Goal::new("version", "Version", Environment::Code);
pub const DOCKER_BUILD: Goal = Goal::new("docker-build", "Docker build", Environment::Code);
pub const TAG: Goal = Goal::new("tag", "Tag", Environment::Code);
pub const NPM_PUBLISH: Goal = Goal::new("npm-publish", "Publish to npm", Environment::Code);
pub const LOCAL_DEPLOY: Goal = Goal::new("local-deploy", "Deploy locally", Environment::Local);
pub const LOCAL_ENDPOINT: Goal =
    Goal::new("local-endpoint", "Locate local service endpoint", Environment::Local);
pub const LOCAL_UNDEPLOY: Goal =
    Goal::new("local-undeploy", "Undeploy locally", Environment::Local);
pub const STAGING_DEPLOY: Goal =
    Goal::new("staging-deploy", "Deploy to Test", Environment::Staging);
pub const STAGING_ENDPOINT: Goal =
    Goal::new("staging-endpoint", "Locate service endpoint in Test", Environment::Staging);
pub const STAGING_VERIFY: Goal =
    Goal::new("staging-verify", "Verify Test deployment", Environment::Staging);
pub const STAGING_UNDEPLOY: Goal =
    Goal::new("staging-undeploy", "Undeploy from Test", Environment::Staging);
pub const STAGING_DOCKER_DEPLOY: Goal =
    Goal::new("staging-docker-deploy", "Deploy image to Test", Environment::Staging);
pub const PRODUCTION_DEPLOY: Goal =
    Goal::new("production-deploy", "Deploy to Prod", Environment::Production);
pub const PRODUCTION_ENDPOINT: Goal =
    Goal::new("production-endpoint", "Locate service endpoint in Prod", Environment::Production);
pub const PRODUCTION_UNDEPLOY: Goal =
    Goal::new("production-undeploy", "Undeploy from Prod", Environment::Production);
pub const PRODUCTION_DOCKER_DEPLOY: Goal =
    Goal::new("production-docker-deploy", "Deploy image to Prod", Environment::Production);
pub const DELETE_REPOSITORY: Goal =
    Goal::new("delete-repository", "Delete repository", Environment::Code);

const CATALOG: &[Goal] = &[
    AUTOFIX,
    REVIEW,
    CODE_REACTION,
    FINGERPRINT,
    BUILD,
    JUST_BUILD,
    ARTIFACT,
    VERSION,
    DOCKER_BUILD,
    TAG,
    NPM_PUBLISH,
    LOCAL_DEPLOY,
    LOCAL_ENDPOINT,
    LOCAL_UNDEPLOY,
    STAGING_DEPLOY,
    STAGING_ENDPOINT,
    STAGING_VERIFY,
    STAGING_UNDEPLOY,
    STAGING_DOCKER_DEPLOY,
    PRODUCTION_DEPLOY,
    PRODUCTION_ENDPOINT,
    PRODUCTION_UNDEPLOY,
    PRODUCTION_DOCKER_DEPLOY,
    DELETE_REPOSITORY,
];

/// An ordered, non-empty set of distinct goals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalSet {
    name: String,
    description: String,
    goals: Vec<Goal>,
}

impl GoalSet {
    /// Creates a goal set
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `goals` is empty or contains the
    /// same goal twice. Use `GoalOutcome::NoGoals` to assign nothing.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        goals: Vec<Goal>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if goals.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Goal set '{}' has no goals",
                name
            )));
        }

        let mut seen = HashSet::new();
        for goal in &goals {
            if !seen.insert(goal.key()) {
                return Err(ConfigError::Validation(format!(
                    "Goal set '{}' contains goal '{}' more than once",
                    name,
                    goal.key()
                )));
            }
        }

        Ok(Self {
            name,
            description: description.into(),
            goals,
        })
    }

    /// Builds one of the standard sets, whose contents are known to be valid
    fn standard(name: &str, description: &str, goals: &[Goal]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            goals: goals.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn contains(&self, goal: &Goal) -> bool {
        self.goals.contains(goal)
    }

    /// Returns true if any goal of the set needs a builder
    pub fn requires_build(&self) -> bool {
        self.goals.iter().any(Goal::is_build)
    }

    /// Goals of the set that are fulfilled by deployers
    pub fn deployment_goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter().filter(|g| g.is_deployment())
    }

    pub fn library() -> Self {
        Self::standard(
            "library",
            "Build a library",
            &[AUTOFIX, REVIEW, CODE_REACTION, BUILD, ARTIFACT],
        )
    }

    pub fn http_service() -> Self {
        Self::standard(
            "http-service",
            "Build and deploy an HTTP service",
            &[
                AUTOFIX,
                REVIEW,
                CODE_REACTION,
                FINGERPRINT,
                BUILD,
                ARTIFACT,
                STAGING_DEPLOY,
                STAGING_ENDPOINT,
                STAGING_VERIFY,
                PRODUCTION_DEPLOY,
                PRODUCTION_ENDPOINT,
            ],
        )
    }

    pub fn local_deployment() -> Self {
        Self::standard(
            "local-deployment",
            "Build and deploy locally",
            &[
                AUTOFIX,
                REVIEW,
                CODE_REACTION,
                BUILD,
                ARTIFACT,
                LOCAL_DEPLOY,
                LOCAL_ENDPOINT,
            ],
        )
    }

    pub fn npm_build() -> Self {
        Self::standard(
            "npm-build",
            "Build with npm",
            &[AUTOFIX, REVIEW, CODE_REACTION, BUILD],
        )
    }

    pub fn npm_deploy() -> Self {
        Self::standard(
            "npm-deploy",
            "Build and deploy with npm",
            &[
                AUTOFIX,
                REVIEW,
                CODE_REACTION,
                BUILD,
                ARTIFACT,
                STAGING_DEPLOY,
                STAGING_ENDPOINT,
                STAGING_VERIFY,
                PRODUCTION_DEPLOY,
                PRODUCTION_ENDPOINT,
            ],
        )
    }

    pub fn npm_docker() -> Self {
        Self::standard(
            "npm-docker",
            "Build a Docker image with npm",
            &[
                AUTOFIX,
                REVIEW,
                CODE_REACTION,
                VERSION,
                BUILD,
                DOCKER_BUILD,
                TAG,
                NPM_PUBLISH,
            ],
        )
    }

    pub fn npm_kubernetes_deploy() -> Self {
        Self::standard(
            "npm-kubernetes-deploy",
            "Build a Docker image with npm and deploy to Kubernetes",
            &[
                AUTOFIX,
                REVIEW,
                CODE_REACTION,
                VERSION,
                BUILD,
                DOCKER_BUILD,
                TAG,
                STAGING_DOCKER_DEPLOY,
                PRODUCTION_DOCKER_DEPLOY,
            ],
        )
    }

    pub fn undeploy_everywhere() -> Self {
        Self::standard(
            "undeploy-everywhere",
            "Undeploy from every environment",
            &[STAGING_UNDEPLOY, PRODUCTION_UNDEPLOY, LOCAL_UNDEPLOY],
        )
    }

    pub fn repository_deletion() -> Self {
        Self::standard(
            "repository-deletion",
            "Delete the repository",
            &[DELETE_REPOSITORY],
        )
    }

    pub fn verify_artifact() -> Self {
        Self::standard("verify-artifact", "Verify artifact", &[JUST_BUILD, ARTIFACT])
    }

    pub fn autofix_only() -> Self {
        Self::standard("autofix-only", "Autofix only", &[AUTOFIX])
    }

    pub fn review_only() -> Self {
        Self::standard("review-only", "Review only", &[REVIEW])
    }

    /// Looks up a standard goal set by name
    pub fn standard_by_name(name: &str) -> Option<GoalSet> {
        let set = match name {
            "library" => Self::library(),
            "http-service" => Self::http_service(),
            "local-deployment" => Self::local_deployment(),
            "npm-build" => Self::npm_build(),
            "npm-deploy" => Self::npm_deploy(),
            "npm-docker" => Self::npm_docker(),
            "npm-kubernetes-deploy" => Self::npm_kubernetes_deploy(),
            "undeploy-everywhere" => Self::undeploy_everywhere(),
            "repository-deletion" => Self::repository_deletion(),
            "verify-artifact" => Self::verify_artifact(),
            "autofix-only" => Self::autofix_only(),
            "review-only" => Self::review_only(),
            _ => return None,
        };
        Some(set)
    }

    /// Names of all standard goal sets
    pub fn standard_names() -> &'static [&'static str] {
        &[
            "library",
            "http-service",
            "local-deployment",
            "npm-build",
            "npm-deploy",
            "npm-docker",
            "npm-kubernetes-deploy",
            "undeploy-everywhere",
            "repository-deletion",
            "verify-artifact",
            "autofix-only",
            "review-only",
        ]
    }
}

impl fmt::Display for GoalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.goals.iter().map(Goal::key).collect();
        write!(f, "{} [{}]", self.name, keys.join(", "))
    }
}

/// What a goal-setting rule decides
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GoalOutcome {
    /// Assign these goals
    Goals(GoalSet),
    /// Explicitly assign no goals
    NoGoals,
    /// Do not decide; a later layer or default applies
    DoNotSetAnyGoals,
}

impl GoalOutcome {
    /// Resolves the outcome names used in configuration
    ///
    /// `no-goals` and `do-not-set-any-goals` are sentinels; anything else must
    /// name a standard goal set.
    pub fn from_name(name: &str) -> Option<GoalOutcome> {
        match name {
            "no-goals" => Some(GoalOutcome::NoGoals),
            "do-not-set-any-goals" => Some(GoalOutcome::DoNotSetAnyGoals),
            other => GoalSet::standard_by_name(other).map(GoalOutcome::Goals),
        }
    }

    pub fn goal_set(&self) -> Option<&GoalSet> {
        match self {
            GoalOutcome::Goals(set) => Some(set),
            _ => None,
        }
    }
}

impl From<GoalSet> for GoalOutcome {
    fn from(set: GoalSet) -> Self {
        GoalOutcome::Goals(set)
    }
}

impl fmt::Display for GoalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalOutcome::Goals(set) => write!(f, "{}", set),
            GoalOutcome::NoGoals => f.write_str("no goals"),
            GoalOutcome::DoNotSetAnyGoals => f.write_str("do not set any goals"),
        }
    }
}
