#![forbid(unsafe_code)]

//! Parallel evaluation of push documents
//!
//! The ExecutionEngine loads push documents, completes their project
//! snapshots, and runs them through a delivery machine in parallel using
//! rayon. Reports come back in the order the documents were given.

use crate::error::PushRulesError;
use crate::goals::GoalOutcome;
use crate::machine::{PushPlan, SoftwareDeliveryMachine};
use crate::push::{ProjectSnapshot, PushContext};
use crate::rules::EvaluationResult;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which of the machine's decisions to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Goals, builder and deployers
    Plan,
    /// Disposal goals
    Dispose,
}

/// Disposal decision for one push
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisposalPlan {
    pub repo: String,
    pub branch: String,
    pub goals: EvaluationResult<GoalOutcome>,
}

/// What the machine decided for one push
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Verdict {
    Plan(PushPlan),
    Disposal(DisposalPlan),
}

impl Verdict {
    /// The goal-table result behind the verdict
    pub fn goals(&self) -> &EvaluationResult<GoalOutcome> {
        match self {
            Verdict::Plan(plan) => &plan.goals,
            Verdict::Disposal(plan) => &plan.goals,
        }
    }
}

/// Result for one push document
#[derive(Debug)]
pub struct PushReport {
    /// Document the push was read from
    pub source: PathBuf,
    pub result: Result<Verdict, PushRulesError>,
}

/// Result of evaluating a batch of pushes
#[derive(Debug)]
pub struct ExecutionResult {
    /// One report per push, in input order
    pub reports: Vec<PushReport>,
    /// Number of pushes that produced a verdict
    pub pushes_evaluated: usize,
}

impl ExecutionResult {
    /// Pushes whose goal table matched a rule
    pub fn matched(&self) -> usize {
        self.verdicts().filter(|v| v.goals().is_matched()).count()
    }

    /// Pushes no goal rule applied to
    pub fn unmatched(&self) -> usize {
        self.verdicts().filter(|v| !v.goals().is_matched()).count()
    }

    /// Pushes that failed to load or evaluate
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_err()).count()
    }

    fn verdicts(&self) -> impl Iterator<Item = &Verdict> {
        self.reports.iter().filter_map(|r| r.result.as_ref().ok())
    }
}

/// Execution engine that evaluates pushes against one machine
pub struct ExecutionEngine {
    machine: Arc<SoftwareDeliveryMachine>,
    project: Option<ProjectSnapshot>,
    exclude: Vec<String>,
}

impl ExecutionEngine {
    /// Creates an engine for `machine`
    pub fn new(machine: SoftwareDeliveryMachine) -> Self {
        Self {
            machine: Arc::new(machine),
            project: None,
            exclude: Vec::new(),
        }
    }

    /// Uses `project` as the snapshot of every push, replacing whatever the
    /// push documents carry
    pub fn with_project(mut self, project: ProjectSnapshot) -> Self {
        self.project = Some(project);
        self
    }

    /// Patterns left out when a push document's checkout root is walked
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn machine(&self) -> &SoftwareDeliveryMachine {
        &self.machine
    }

    /// Loads and evaluates push documents in parallel
    pub fn execute(&self, sources: &[PathBuf], mode: Mode) -> ExecutionResult {
        let reports: Vec<PushReport> = sources
            .par_iter()
            .map(|source| PushReport {
                source: source.clone(),
                result: self.execute_source(source, mode),
            })
            .collect();

        let pushes_evaluated = reports.iter().filter(|r| r.result.is_ok()).count();
        tracing::debug!(
            pushes = reports.len(),
            evaluated = pushes_evaluated,
            "batch finished"
        );

        ExecutionResult {
            reports,
            pushes_evaluated,
        }
    }

    fn execute_source(&self, source: &Path, mode: Mode) -> Result<Verdict, PushRulesError> {
        let ctx = PushContext::load(source)?;
        let ctx = self.prepare(ctx)?;
        self.evaluate(&ctx, mode)
    }

    /// Completes a push's project snapshot
    ///
    /// An engine-wide project replaces the push's own. A push that names a
    /// checkout root but lists no files gets the root walked.
    pub fn prepare(&self, mut ctx: PushContext) -> Result<PushContext, PushRulesError> {
        if let Some(project) = &self.project {
            ctx.project = project.clone();
        } else if ctx.project.is_empty()
            && let Some(root) = ctx.project.root()
        {
            ctx.project = ProjectSnapshot::from_dir(root, &self.exclude)?;
        }
        Ok(ctx)
    }

    /// Evaluates one prepared push
    pub fn evaluate(&self, ctx: &PushContext, mode: Mode) -> Result<Verdict, PushRulesError> {
        match mode {
            Mode::Plan => Ok(Verdict::Plan(self.machine.plan(ctx)?)),
            Mode::Dispose => Ok(Verdict::Disposal(DisposalPlan {
                repo: ctx.repo.slug(),
                branch: ctx.branch.clone(),
                goals: self.machine.plan_disposal(ctx)?,
            })),
        }
    }
}
