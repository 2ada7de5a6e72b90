#![forbid(unsafe_code)]

//! The software delivery machine
//!
//! A machine bundles the rule tables that decide what happens to a push:
//! which goals it gets, which builder builds it, which deployer fulfils each
//! deployment goal, and which goals apply when a repository is disposed of.
//! Machines are assembled with [`MachineBuilder`]; building seals every table.

pub mod presets;

use crate::error::{ConfigError, EvaluationError};
use crate::goals::{Goal, GoalOutcome};
use crate::push::PushContext;
use crate::rules::{EvaluationResult, Outcome, Rule, RuleTable};
use crate::types::Environment;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use presets::{
    Preset, artifact_verifying_machine, cloud_foundry_machine, k8s_machine,
    static_analysis_machine,
};

/// How a project is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderSpec {
    pub name: String,
    /// Shell commands run in order; empty for builders that delegate elsewhere
    #[serde(default)]
    pub commands: Vec<String>,
}

impl BuilderSpec {
    pub fn new<I, S>(name: impl Into<String>, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }
}

impl Outcome for BuilderSpec {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("builder name is empty".to_string());
        }
        if self.commands.iter().any(|c| c.trim().is_empty()) {
            return Err(format!("builder '{}' has an empty command", self.name));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.commands.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.commands.join(" && "))
        }
    }
}

/// Where a deployment goal is fulfilled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployerSpec {
    pub name: String,
    pub environment: Environment,
}

impl DeployerSpec {
    pub fn new(name: impl Into<String>, environment: Environment) -> Self {
        Self {
            name: name.into(),
            environment,
        }
    }
}

impl Outcome for DeployerSpec {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("deployer name is empty".to_string());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} -> {}", self.name, self.environment)
    }
}

/// The builder picked for a push
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuilderSelection {
    /// Index of the matching build rule; `None` when the default builder applies
    pub rule: Option<usize>,
    pub label: String,
    pub builder: BuilderSpec,
}

/// The deployer picked for one deployment goal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployerSelection {
    pub goal: Goal,
    pub rule: usize,
    pub label: String,
    pub deployer: DeployerSpec,
}

/// Everything the machine decided about one push
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushPlan {
    pub repo: String,
    pub branch: String,
    pub goals: EvaluationResult<GoalOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder: Option<BuilderSelection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deployers: Vec<DeployerSelection>,
    /// Goals of the chosen set that no builder or deployer can fulfil
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unfulfilled: Vec<Goal>,
}

impl PushPlan {
    /// The assigned goals, if a goal set was chosen
    pub fn goals(&self) -> Option<&[Goal]> {
        self.goals
            .outcome()
            .and_then(GoalOutcome::goal_set)
            .map(|set| set.goals())
    }
}

/// A configured delivery machine
pub struct SoftwareDeliveryMachine {
    name: String,
    goal_rules: RuleTable<GoalOutcome>,
    build_rules: RuleTable<BuilderSpec>,
    default_builder: Option<BuilderSpec>,
    deploy_rules: BTreeMap<Goal, RuleTable<DeployerSpec>>,
    disposal_rules: RuleTable<GoalOutcome>,
}

impl SoftwareDeliveryMachine {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn goal_rules(&self) -> &RuleTable<GoalOutcome> {
        &self.goal_rules
    }

    pub fn build_rules(&self) -> &RuleTable<BuilderSpec> {
        &self.build_rules
    }

    pub fn default_builder(&self) -> Option<&BuilderSpec> {
        self.default_builder.as_ref()
    }

    /// Deploy tables keyed by the goal they fulfil
    pub fn deploy_rules(&self) -> impl Iterator<Item = (&Goal, &RuleTable<DeployerSpec>)> {
        self.deploy_rules.iter()
    }

    pub fn disposal_rules(&self) -> &RuleTable<GoalOutcome> {
        &self.disposal_rules
    }

    /// Decides goals, builder and deployers for a push
    ///
    /// Builders and deployers are only selected when the goal rules choose a
    /// goal set. A build goal with no matching build rule falls back to the
    /// default builder; anything still without an implementation is listed as
    /// unfulfilled.
    ///
    /// # Errors
    ///
    /// Returns the first `EvaluationError` raised by any table.
    pub fn plan(&self, ctx: &PushContext) -> Result<PushPlan, EvaluationError> {
        let goals = self.goal_rules.evaluate(ctx)?;
        let mut plan = PushPlan {
            repo: ctx.repo.slug(),
            branch: ctx.branch.clone(),
            goals,
            builder: None,
            deployers: Vec::new(),
            unfulfilled: Vec::new(),
        };

        let Some(set) = plan.goals.outcome().and_then(GoalOutcome::goal_set).cloned() else {
            return Ok(plan);
        };

        if set.requires_build() {
            plan.builder = self.select_builder(ctx)?;
            if plan.builder.is_none() {
                plan.unfulfilled
                    .extend(set.goals().iter().filter(|g| g.is_build()).copied());
            }
        }

        for goal in set.deployment_goals() {
            match self.select_deployer(goal, ctx)? {
                Some(selection) => plan.deployers.push(selection),
                None => plan.unfulfilled.push(*goal),
            }
        }

        tracing::debug!(
            repo = %plan.repo,
            goals = %set,
            deployers = plan.deployers.len(),
            unfulfilled = plan.unfulfilled.len(),
            "planned push"
        );
        Ok(plan)
    }

    fn select_builder(
        &self,
        ctx: &PushContext,
    ) -> Result<Option<BuilderSelection>, EvaluationError> {
        if let EvaluationResult::Matched(m) = self.build_rules.evaluate(ctx)? {
            return Ok(Some(BuilderSelection {
                rule: Some(m.index),
                label: m.label,
                builder: m.outcome,
            }));
        }
        Ok(self.default_builder.clone().map(|builder| BuilderSelection {
            rule: None,
            label: "default builder".to_string(),
            builder,
        }))
    }

    fn select_deployer(
        &self,
        goal: &Goal,
        ctx: &PushContext,
    ) -> Result<Option<DeployerSelection>, EvaluationError> {
        let Some(table) = self.deploy_rules.get(goal) else {
            return Ok(None);
        };
        Ok(match table.evaluate(ctx)? {
            EvaluationResult::Matched(m) => Some(DeployerSelection {
                goal: *goal,
                rule: m.index,
                label: m.label,
                deployer: m.outcome,
            }),
            EvaluationResult::Unmatched => None,
        })
    }

    /// Decides the goals that apply when the pushed repository is disposed of
    ///
    /// # Errors
    ///
    /// Returns the `EvaluationError` raised by the disposal table.
    pub fn plan_disposal(
        &self,
        ctx: &PushContext,
    ) -> Result<EvaluationResult<GoalOutcome>, EvaluationError> {
        self.disposal_rules.evaluate(ctx)
    }

    /// Plans many pushes in parallel; results are in input order
    pub fn plan_all(&self, contexts: &[PushContext]) -> Vec<Result<PushPlan, EvaluationError>> {
        contexts.par_iter().map(|ctx| self.plan(ctx)).collect()
    }
}

impl fmt::Debug for SoftwareDeliveryMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareDeliveryMachine")
            .field("name", &self.name)
            .field("goal_rules", &self.goal_rules)
            .field("build_rules", &self.build_rules)
            .field("default_builder", &self.default_builder)
            .field("deploy_rules", &self.deploy_rules.keys().collect::<Vec<_>>())
            .field("disposal_rules", &self.disposal_rules)
            .finish()
    }
}

/// Collects rules and assembles a sealed [`SoftwareDeliveryMachine`]
///
/// Rules are kept in the order they are added; that order is evaluation order.
#[derive(Debug, Clone)]
pub struct MachineBuilder {
    name: String,
    goal_rules: Vec<Rule<GoalOutcome>>,
    build_rules: Vec<Rule<BuilderSpec>>,
    default_builder: Option<BuilderSpec>,
    deploy_rules: Vec<(Goal, Rule<DeployerSpec>)>,
    disposal_rules: Vec<Rule<GoalOutcome>>,
}

impl MachineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal_rules: Vec::new(),
            build_rules: Vec::new(),
            default_builder: None,
            deploy_rules: Vec::new(),
            disposal_rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn goal_rule(mut self, rule: Rule<GoalOutcome>) -> Self {
        self.goal_rules.push(rule);
        self
    }

    pub fn goal_rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = Rule<GoalOutcome>>,
    {
        self.goal_rules.extend(rules);
        self
    }

    pub fn build_rule(mut self, rule: Rule<BuilderSpec>) -> Self {
        self.build_rules.push(rule);
        self
    }

    /// Builder used when a build is needed and no build rule matches
    ///
    /// A later call replaces an earlier default.
    pub fn default_builder(mut self, builder: BuilderSpec) -> Self {
        self.default_builder = Some(builder);
        self
    }

    /// Registers a deploy rule for each of `goals`
    ///
    /// Typically a deploy goal together with its undeploy goal.
    pub fn deploy_rule(mut self, goals: &[Goal], rule: Rule<DeployerSpec>) -> Self {
        for goal in goals {
            self.deploy_rules.push((*goal, rule.clone()));
        }
        self
    }

    pub fn disposal_rule(mut self, rule: Rule<GoalOutcome>) -> Self {
        self.disposal_rules.push(rule);
        self
    }

    /// Builds and seals the machine
    ///
    /// # Errors
    ///
    /// - `ConfigError::Validation` if a deploy rule targets a goal that is not
    ///   a deployment goal
    /// - `ConfigError::InvalidOutcome` if any rule or the default builder has
    ///   a malformed outcome
    pub fn build(self) -> Result<SoftwareDeliveryMachine, ConfigError> {
        let goal_rules = RuleTable::new("goals")?;
        for rule in self.goal_rules {
            goal_rules.push_rule(rule)?;
        }

        let build_rules = RuleTable::new("build")?;
        for rule in self.build_rules {
            build_rules.push_rule(rule)?;
        }

        if let Some(builder) = &self.default_builder {
            builder
                .validate()
                .map_err(|message| ConfigError::InvalidOutcome {
                    label: "default builder".to_string(),
                    message,
                })?;
        }

        let mut deploy_rules: BTreeMap<Goal, RuleTable<DeployerSpec>> = BTreeMap::new();
        for (goal, rule) in self.deploy_rules {
            if !goal.is_deployment() {
                return Err(ConfigError::Validation(format!(
                    "Deploy rule '{}' targets '{}', which is not a deployment goal",
                    rule.label(),
                    goal
                )));
            }
            let table = match deploy_rules.entry(goal) {
                std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(RuleTable::new(&format!("deploy-{}", goal.key()))?)
                }
            };
            table.push_rule(rule)?;
        }

        let disposal_rules = RuleTable::new("disposal")?;
        for rule in self.disposal_rules {
            disposal_rules.push_rule(rule)?;
        }

        goal_rules.seal();
        build_rules.seal();
        deploy_rules.values().for_each(RuleTable::seal);
        disposal_rules.seal();

        tracing::debug!(
            machine = %self.name,
            goal_rules = goal_rules.len(),
            build_rules = build_rules.len(),
            deploy_tables = deploy_rules.len(),
            disposal_rules = disposal_rules.len(),
            "built delivery machine"
        );

        Ok(SoftwareDeliveryMachine {
            name: self.name,
            goal_rules,
            build_rules,
            default_builder: self.default_builder,
            deploy_rules,
            disposal_rules,
        })
    }
}
