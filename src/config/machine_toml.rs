//! Parsing and validation for machine.toml configuration files

use crate::error::ConfigError;
use crate::goals::{Goal, GoalOutcome, GoalSet};
use crate::machine::{
    BuilderSpec, DeployerSpec, MachineBuilder, Preset, SoftwareDeliveryMachine,
};
use crate::rules::{PushTestRegistry, Rule};
use crate::types::Environment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Main configuration struct for machine.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MachineConfig {
    /// Machine metadata
    pub machine: MachineMeta,

    /// Custom goal sets, by name
    #[serde(default)]
    pub goal_sets: BTreeMap<String, GoalSetConfig>,

    /// Goal rules, evaluated before any preset goal rules
    #[serde(default)]
    pub goal_rules: Vec<GoalRuleConfig>,

    /// Named builders referenced by build rules
    #[serde(default)]
    pub builders: BTreeMap<String, BuilderConfig>,

    #[serde(default)]
    pub build_rules: Vec<BuildRuleConfig>,

    #[serde(default)]
    pub deploy_rules: Vec<DeployRuleConfig>,

    #[serde(default)]
    pub disposal_rules: Vec<GoalRuleConfig>,

    /// Checkout snapshot settings
    #[serde(default)]
    pub project: ProjectConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

impl MachineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: MachineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Every push test, goal, goal set and builder reference is resolved and
    /// the machine is built once, so a configuration that loads also builds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.machine.version != "1" {
            return Err(ConfigError::Validation(format!(
                "Unsupported configuration version '{}'. Expected '1'",
                self.machine.version
            )));
        }

        if self.machine.preset.is_none() && self.goal_rules.is_empty() {
            return Err(ConfigError::Validation(
                "No goal rules configured. Add [[goal-rules]] or set machine.preset in machine.toml."
                    .to_string(),
            ));
        }

        for pattern in &self.project.exclude {
            globset::Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }

        self.build_machine()?;
        Ok(())
    }

    /// Name of the machine: configured, else the preset's, else a generic one
    pub fn machine_name(&self) -> String {
        match (&self.machine.name, self.machine.preset) {
            (Some(name), _) => name.clone(),
            (None, Some(preset)) => preset.machine_name().to_string(),
            (None, None) => "Software delivery machine".to_string(),
        }
    }

    /// Builds the machine with the built-in push tests
    pub fn build_machine(&self) -> Result<SoftwareDeliveryMachine, ConfigError> {
        self.build_machine_with(&PushTestRegistry::with_builtins())
    }

    /// Builds the machine resolving push tests against `registry`
    pub fn build_machine_with(
        &self,
        registry: &PushTestRegistry,
    ) -> Result<SoftwareDeliveryMachine, ConfigError> {
        self.machine_builder(registry)?.build()
    }

    /// Translates the configuration into a [`MachineBuilder`]
    ///
    /// Configured rules come first in every table; the preset's rules follow.
    pub fn machine_builder(
        &self,
        registry: &PushTestRegistry,
    ) -> Result<MachineBuilder, ConfigError> {
        let goal_sets = self.resolve_goal_sets()?;
        let mut builder = MachineBuilder::new(self.machine_name());

        for rule in &self.goal_rules {
            builder = builder.goal_rule(Rule::new(
                registry.resolve_all(&rule.when)?,
                rule.label.clone(),
                resolve_outcome(&rule.goals, &goal_sets)?,
            ));
        }

        let builders: BTreeMap<&str, BuilderSpec> = self
            .builders
            .iter()
            .map(|(name, config)| {
                (
                    name.as_str(),
                    BuilderSpec::new(name.clone(), config.commands.clone()),
                )
            })
            .collect();
        let lookup_builder = |name: &str| {
            builders.get(name).cloned().ok_or_else(|| {
                ConfigError::Validation(format!(
                    "Unknown builder '{}'. Define it under [builders.{}]",
                    name, name
                ))
            })
        };

        for rule in &self.build_rules {
            builder = builder.build_rule(Rule::new(
                registry.resolve_all(&rule.when)?,
                rule.label.clone(),
                lookup_builder(&rule.builder)?,
            ));
        }

        for rule in &self.deploy_rules {
            let goal = Goal::from_key(&rule.goal)
                .ok_or_else(|| ConfigError::UnknownGoal(rule.goal.clone()))?;
            let environment = rule.environment.unwrap_or_else(|| goal.environment());
            builder = builder.deploy_rule(
                &[goal],
                Rule::new(
                    registry.resolve_all(&rule.when)?,
                    rule.label.clone(),
                    DeployerSpec::new(rule.deployer.clone(), environment),
                ),
            );
        }

        for rule in &self.disposal_rules {
            builder = builder.disposal_rule(Rule::new(
                registry.resolve_all(&rule.when)?,
                rule.label.clone(),
                resolve_outcome(&rule.goals, &goal_sets)?,
            ));
        }

        if let Some(preset) = self.machine.preset {
            builder = preset.apply(builder);
        }

        // A configured default replaces the preset's.
        if let Some(name) = &self.machine.default_builder {
            builder = builder.default_builder(lookup_builder(name)?);
        }

        Ok(builder)
    }

    fn resolve_goal_sets(&self) -> Result<BTreeMap<String, GoalSet>, ConfigError> {
        let mut sets = BTreeMap::new();
        for (name, config) in &self.goal_sets {
            if GoalOutcome::from_name(name).is_some() {
                return Err(ConfigError::Validation(format!(
                    "Goal set '{}' shadows a built-in goal set",
                    name
                )));
            }
            let goals = config
                .goals
                .iter()
                .map(|key| Goal::from_key(key).ok_or_else(|| ConfigError::UnknownGoal(key.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            let description = config.description.clone().unwrap_or_else(|| name.clone());
            sets.insert(name.clone(), GoalSet::new(name.clone(), description, goals)?);
        }
        Ok(sets)
    }
}

fn resolve_outcome(
    name: &str,
    custom: &BTreeMap<String, GoalSet>,
) -> Result<GoalOutcome, ConfigError> {
    if let Some(set) = custom.get(name) {
        return Ok(GoalOutcome::Goals(set.clone()));
    }
    GoalOutcome::from_name(name).ok_or_else(|| ConfigError::UnknownGoalSet(name.to_string()))
}

/// Machine metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MachineMeta {
    /// Configuration version (must be "1")
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Preset whose rules follow the configured ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,

    /// Builder used when a build is needed and no build rule matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_builder: Option<String>,
}

/// A custom goal set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Catalog goal keys, in order
    pub goals: Vec<String>,
}

/// A goal-setting rule (`[[goal-rules]]` and `[[disposal-rules]]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRuleConfig {
    pub label: String,

    /// Push test specs; empty matches every push
    #[serde(default)]
    pub when: Vec<String>,

    /// Goal set name, `no-goals` or `do-not-set-any-goals`
    pub goals: String,
}

/// A named builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRuleConfig {
    pub label: String,

    #[serde(default)]
    pub when: Vec<String>,

    /// Name of a builder defined under `[builders]`
    pub builder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRuleConfig {
    /// Deployment goal key this rule fulfils
    pub goal: String,

    pub label: String,

    #[serde(default)]
    pub when: Vec<String>,

    pub deployer: String,

    /// Target environment; defaults to the goal's environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

/// Project snapshot section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Glob patterns left out of checkout snapshots
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Output configuration section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Color output setting
    #[serde(default)]
    pub color: ColorOption,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON Lines format
    Jsonl,
}

/// Color output options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorOption {
    /// Auto-detect based on terminal capabilities
    #[default]
    Auto,
    /// Always use color
    Always,
    /// Never use color
    Never,
}
