#![forbid(unsafe_code)]

//! Ready-made machines
//!
//! Each preset appends its rules to a [`MachineBuilder`], after any rules the
//! builder already holds. Configuration uses this to put its own rules in
//! front of a preset's.

use crate::error::ConfigError;
use crate::goals::{self, GoalOutcome, GoalSet};
use crate::machine::{BuilderSpec, DeployerSpec, MachineBuilder, SoftwareDeliveryMachine};
use crate::rules::{
    any_push, from_atomist, has_atomist_build_file, has_cloud_foundry_manifest, has_dockerfile,
    has_k8s_spec, has_spring_boot_application_class, has_travis_file, is_deploy_enabled, is_java,
    is_lein, is_maven, is_node, material_change_to_java_repo, material_change_to_node_repo,
    named_seed_repo, not, to_default_branch, to_public_repo, when_push_satisfies,
};
use crate::types::Environment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named preset selectable from `machine.toml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    CloudFoundry,
    K8s,
    ArtifactVerifying,
    StaticAnalysis,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::CloudFoundry,
        Preset::K8s,
        Preset::ArtifactVerifying,
        Preset::StaticAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::CloudFoundry => "cloud-foundry",
            Preset::K8s => "k8s",
            Preset::ArtifactVerifying => "artifact-verifying",
            Preset::StaticAnalysis => "static-analysis",
        }
    }

    /// Name the preset gives a machine
    pub fn machine_name(&self) -> &'static str {
        match self {
            Preset::CloudFoundry => "CloudFoundry software delivery machine",
            Preset::K8s => "K8s software delivery machine",
            Preset::ArtifactVerifying => "Artifact verifying machine",
            Preset::StaticAnalysis => "Static analysis machine",
        }
    }

    /// Appends the preset's rules
    pub fn apply(&self, builder: MachineBuilder) -> MachineBuilder {
        match self {
            Preset::CloudFoundry => cloud_foundry_rules(builder),
            Preset::K8s => k8s_rules(builder),
            Preset::ArtifactVerifying => artifact_verifying_rules(builder),
            Preset::StaticAnalysis => static_analysis_rules(builder),
        }
    }

    /// Builds the preset machine on its own
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the machine fails to build.
    pub fn machine(&self) -> Result<SoftwareDeliveryMachine, ConfigError> {
        self.apply(MachineBuilder::new(self.machine_name())).build()
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Preset::ALL.iter().map(Preset::as_str).collect();
                ConfigError::Validation(format!(
                    "Unknown preset '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Java, Spring and Node, deploying to Cloud Foundry
///
/// # Errors
///
/// Returns `ConfigError` if the machine fails to build.
pub fn cloud_foundry_machine() -> Result<SoftwareDeliveryMachine, ConfigError> {
    Preset::CloudFoundry.machine()
}

/// Java, Spring and Node, deploying to Kubernetes
///
/// # Errors
///
/// Returns `ConfigError` if the machine fails to build.
pub fn k8s_machine() -> Result<SoftwareDeliveryMachine, ConfigError> {
    Preset::K8s.machine()
}

/// Builds and verifies Maven artifacts only
///
/// # Errors
///
/// Returns `ConfigError` if the machine fails to build.
pub fn artifact_verifying_machine() -> Result<SoftwareDeliveryMachine, ConfigError> {
    Preset::ArtifactVerifying.machine()
}

/// Reviews Java changes only
///
/// # Errors
///
/// Returns `ConfigError` if the machine fails to build.
pub fn static_analysis_machine() -> Result<SoftwareDeliveryMachine, ConfigError> {
    Preset::StaticAnalysis.machine()
}

fn maven_builder() -> BuilderSpec {
    BuilderSpec::new("maven", ["mvn package"])
}

fn npm_builder(script: &str) -> BuilderSpec {
    BuilderSpec::new(
        format!("npm-run-{}", script),
        ["npm ci".to_string(), format!("npm run {}", script)],
    )
}

/// Local deployment of Spring Boot services, shared by the Java machines
fn spring_local_deploy(builder: MachineBuilder) -> MachineBuilder {
    builder.deploy_rule(
        &[goals::LOCAL_DEPLOY, goals::LOCAL_UNDEPLOY],
        when_push_satisfies([is_maven()])
            .it_means("Maven local deploy")
            .set(DeployerSpec::new("maven-source", Environment::Local)),
    )
}

fn cloud_foundry_rules(builder: MachineBuilder) -> MachineBuilder {
    let builder = builder
        .goal_rule(
            when_push_satisfies([is_lein()])
                .it_means("Build a Clojure library")
                .set_goals(GoalSet::library()),
        )
        .goal_rule(
            when_push_satisfies([has_travis_file(), is_node()])
                .it_means("Already builds with Travis")
                .set_goals(GoalSet::autofix_only()),
        )
        .goal_rule(
            when_push_satisfies([has_travis_file()])
                .it_means("Already builds with Travis")
                .set_goals(GoalOutcome::DoNotSetAnyGoals),
        )
        .goal_rule(
            when_push_satisfies([
                is_maven(),
                has_spring_boot_application_class(),
                not(material_change_to_java_repo()),
            ])
            .it_means("No material change to Java")
            .set_goals(GoalOutcome::NoGoals),
        )
        .goal_rule(
            when_push_satisfies([
                to_default_branch(),
                is_maven(),
                has_spring_boot_application_class(),
                has_cloud_foundry_manifest(),
                to_public_repo(),
                not(named_seed_repo()),
                not(from_atomist()),
                is_deploy_enabled(),
            ])
            .it_means("Spring Boot service to deploy")
            .set_goals(GoalSet::http_service()),
        )
        .goal_rule(
            when_push_satisfies([
                is_maven(),
                has_spring_boot_application_class(),
                not(from_atomist()),
            ])
            .it_means("Spring Boot service local deploy")
            .set_goals(GoalSet::local_deployment()),
        )
        .goal_rule(
            when_push_satisfies([is_maven()])
                .it_means("Build Java")
                .set_goals(GoalSet::library()),
        )
        .goal_rule(
            when_push_satisfies([is_node(), not(material_change_to_node_repo())])
                .it_means("No material change to Node")
                .set_goals(GoalOutcome::NoGoals),
        )
        .goal_rule(
            when_push_satisfies([
                is_node(),
                has_cloud_foundry_manifest(),
                is_deploy_enabled(),
                to_default_branch(),
            ])
            .it_means("Build and deploy Node")
            .set_goals(GoalSet::npm_deploy()),
        )
        .goal_rule(
            when_push_satisfies([
                is_node(),
                has_dockerfile(),
                to_default_branch(),
                is_deploy_enabled(),
            ])
            .it_means("Docker deploy Node")
            .set_goals(GoalSet::npm_kubernetes_deploy()),
        )
        .goal_rule(
            when_push_satisfies([is_node(), has_dockerfile()])
                .it_means("Docker build Node")
                .set_goals(GoalSet::npm_docker()),
        )
        .goal_rule(
            when_push_satisfies([is_node(), not(has_dockerfile())])
                .it_means("Build Node")
                .set_goals(GoalSet::npm_build()),
        );

    let builder = builder
        .build_rule(
            when_push_satisfies([has_atomist_build_file()])
                .it_means("Custom build script")
                .set(BuilderSpec::new("npm-custom", ["sh .atomist/build.sh"])),
        )
        .build_rule(
            when_push_satisfies([is_node(), to_default_branch()])
                .it_means("npm run build")
                .set(npm_builder("build")),
        )
        .build_rule(
            when_push_satisfies([is_lein()])
                .it_means("Lein build")
                .set(BuilderSpec::new("lein", ["lein do clean, test, uberjar"])),
        )
        .build_rule(
            when_push_satisfies([is_node()])
                .it_means("Just compile")
                .set(npm_builder("compile")),
        )
        .default_builder(maven_builder());

    let builder = builder
        .deploy_rule(
            &[goals::STAGING_DEPLOY, goals::STAGING_UNDEPLOY],
            when_push_satisfies([is_maven()])
                .it_means("Maven test")
                .set(DeployerSpec::new("local-executable-jar", Environment::Staging)),
        )
        .deploy_rule(
            &[goals::PRODUCTION_DEPLOY, goals::PRODUCTION_UNDEPLOY],
            when_push_satisfies([is_maven()])
                .it_means("Maven production")
                .set(DeployerSpec::new(
                    "cloud-foundry-production",
                    Environment::Production,
                )),
        )
        .deploy_rule(
            &[goals::STAGING_DEPLOY, goals::STAGING_UNDEPLOY],
            when_push_satisfies([is_node()])
                .it_means("Node test")
                .set(DeployerSpec::new("cloud-foundry-staging", Environment::Staging)),
        );

    spring_local_deploy(builder)
        .disposal_rule(
            when_push_satisfies([
                is_maven(),
                has_spring_boot_application_class(),
                has_cloud_foundry_manifest(),
            ])
            .it_means("Java project to undeploy from PCF")
            .set_goals(GoalSet::undeploy_everywhere()),
        )
        .disposal_rule(
            when_push_satisfies([is_node(), has_cloud_foundry_manifest()])
                .it_means("Node project to undeploy from PCF")
                .set_goals(GoalSet::undeploy_everywhere()),
        )
        .disposal_rule(
            when_push_satisfies([any_push()])
                .it_means("We can always delete the repo")
                .set_goals(GoalSet::repository_deletion()),
        )
}

fn k8s_rules(builder: MachineBuilder) -> MachineBuilder {
    let builder = builder
        .goal_rule(
            when_push_satisfies([is_maven(), not(material_change_to_java_repo())])
                .it_means("Immaterial change")
                .set_goals(GoalOutcome::NoGoals),
        )
        .goal_rule(
            when_push_satisfies([
                to_default_branch(),
                is_maven(),
                has_spring_boot_application_class(),
                has_k8s_spec(),
                to_public_repo(),
                is_deploy_enabled(),
            ])
            .it_means("Spring Boot service to deploy")
            .set_goals(GoalSet::http_service()),
        )
        .goal_rule(
            when_push_satisfies([
                not(from_atomist()),
                is_maven(),
                has_spring_boot_application_class(),
            ])
            .it_means("Spring Boot service local deploy")
            .set_goals(GoalSet::local_deployment()),
        )
        .goal_rule(
            when_push_satisfies([is_maven(), material_change_to_java_repo()])
                .it_means("Build Java")
                .set_goals(GoalSet::library()),
        )
        .goal_rule(
            when_push_satisfies([is_node(), is_deploy_enabled(), to_default_branch()])
                .it_means("Build and deploy node")
                .set_goals(GoalSet::npm_deploy()),
        )
        .goal_rule(
            when_push_satisfies([is_node()])
                .it_means("Build with npm")
                .set_goals(GoalSet::npm_build()),
        )
        .default_builder(BuilderSpec::new("k8s-automation", Vec::<String>::new()))
        .deploy_rule(
            &[goals::STAGING_DEPLOY],
            when_push_satisfies(Vec::new())
                .it_means("K8s test deploy")
                .set(DeployerSpec::new("k8s-testing", Environment::Staging)),
        )
        .deploy_rule(
            &[goals::PRODUCTION_DEPLOY],
            when_push_satisfies(Vec::new())
                .it_means("K8s production deploy")
                .set(DeployerSpec::new("k8s-production", Environment::Production)),
        );

    spring_local_deploy(builder)
}

fn artifact_verifying_rules(builder: MachineBuilder) -> MachineBuilder {
    builder
        .goal_rule(
            when_push_satisfies([is_maven()])
                .it_means("Push to Maven repo")
                .set_goals(GoalSet::verify_artifact()),
        )
        .build_rule(
            when_push_satisfies([is_maven()])
                .it_means("build with Maven")
                .set(maven_builder()),
        )
}

fn static_analysis_rules(builder: MachineBuilder) -> MachineBuilder {
    builder.goal_rule(
        when_push_satisfies([is_java(), material_change_to_java_repo()])
            .it_means("Change to Java")
            .set_goals(GoalSet::review_only()),
    )
}
