#![forbid(unsafe_code)]

//! First-match rule tables
//!
//! A table is an ordered list of rules. Evaluation walks the rules in
//! registration order and returns the outcome of the first rule whose push
//! tests all hold; later rules are never looked at. The order is the table's
//! contract: operators read a table top to bottom and put specific exceptions
//! above general rules.
//!
//! Registration publishes a fresh copy of the rule list on every addition, so
//! an evaluation always walks the list it started with. Registration is
//! refused while any evaluation is in flight and after the table is sealed.

use crate::error::{ConfigError, EvaluationError};
use crate::push::PushContext;
use crate::rules::predicate::PredicateFn;
use crate::rules::rule::{Outcome, Rule};
use crate::types::TableName;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// The rule that won an evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match<O> {
    /// Zero-based position of the rule in its table
    pub index: usize,
    /// Label of the rule
    pub label: String,
    /// Outcome of the rule
    pub outcome: O,
}

/// Result of evaluating a table against one push
///
/// `Unmatched` is not an error: the caller decides what no applicable rule
/// means.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EvaluationResult<O> {
    Matched(Match<O>),
    Unmatched,
}

impl<O> EvaluationResult<O> {
    pub fn is_matched(&self) -> bool {
        matches!(self, EvaluationResult::Matched(_))
    }

    pub fn outcome(&self) -> Option<&O> {
        match self {
            EvaluationResult::Matched(m) => Some(&m.outcome),
            EvaluationResult::Unmatched => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            EvaluationResult::Matched(m) => Some(&m.label),
            EvaluationResult::Unmatched => None,
        }
    }

    pub fn into_outcome(self) -> Option<O> {
        match self {
            EvaluationResult::Matched(m) => Some(m.outcome),
            EvaluationResult::Unmatched => None,
        }
    }
}

/// Decrements the in-flight counter when an evaluation ends, however it ends
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An ordered, first-match-wins rule table
pub struct RuleTable<O> {
    name: TableName,
    rules: RwLock<Arc<Vec<Rule<O>>>>,
    sealed: AtomicBool,
    in_flight: AtomicUsize,
}

impl<O: Outcome> RuleTable<O> {
    /// Creates an empty table
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `name` is not a valid table name
    /// (alphanumerics, `-` and `_`).
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let name = TableName::new(name)
            .ok_or_else(|| ConfigError::Validation(format!("Invalid table name '{}'", name)))?;
        Ok(Self {
            name,
            rules: RwLock::new(Arc::new(Vec::new())),
            sealed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Appends a rule built from its parts
    ///
    /// Returns the table so registrations can be chained.
    ///
    /// # Errors
    ///
    /// See [`RuleTable::push_rule`].
    pub fn add_rule<I>(
        &self,
        predicates: I,
        label: impl Into<String>,
        outcome: O,
    ) -> Result<&Self, ConfigError>
    where
        I: IntoIterator<Item = PredicateFn>,
    {
        self.push_rule(Rule::new(predicates, label, outcome))
    }

    /// Appends a rule to the end of the table
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidOutcome` if the outcome fails validation
    /// - `ConfigError::Sealed` if the table has been sealed
    /// - `ConfigError::TableInUse` if an evaluation is walking the table
    pub fn push_rule(&self, rule: Rule<O>) -> Result<&Self, ConfigError> {
        rule.outcome()
            .validate()
            .map_err(|message| ConfigError::InvalidOutcome {
                label: rule.label().to_string(),
                message,
            })?;

        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);

        if self.sealed.load(Ordering::SeqCst) {
            return Err(ConfigError::Sealed {
                table: self.name.to_string(),
                label: rule.label().to_string(),
            });
        }
        // Evaluations register themselves under the read lock, so this check
        // cannot race with an evaluation starting.
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return Err(ConfigError::TableInUse {
                table: self.name.to_string(),
                label: rule.label().to_string(),
            });
        }

        tracing::debug!(
            table = %self.name,
            index = rules.len(),
            label = rule.label(),
            "registered rule"
        );

        let mut next = Vec::with_capacity(rules.len() + 1);
        next.extend(rules.iter().cloned());
        next.push(rule);
        *rules = Arc::new(next);

        Ok(self)
    }

    /// Ends the registration phase; later registrations fail
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// The current rule list, in evaluation order
    pub fn rules(&self) -> Arc<Vec<Rule<O>>> {
        self.snapshot()
    }

    fn snapshot(&self) -> Arc<Vec<Rule<O>>> {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&rules)
    }

    /// Evaluates the table against one push
    ///
    /// Rules are tried in registration order, push tests within a rule left to
    /// right; a `false` ends the rule, a match ends the walk.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` naming the rule and push test if a push test
    /// fails. The walk stops there; no later rule is tried.
    pub fn evaluate(&self, ctx: &PushContext) -> Result<EvaluationResult<O>, EvaluationError> {
        let (rules, _in_flight) = {
            let guard = self.rules.read().unwrap_or_else(PoisonError::into_inner);
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            (Arc::clone(&guard), InFlight(&self.in_flight))
        };

        for (index, rule) in rules.iter().enumerate() {
            match rule.matches(ctx) {
                Ok(true) => {
                    tracing::info!(
                        table = %self.name,
                        repo = %ctx.repo,
                        branch = %ctx.branch,
                        index,
                        label = rule.label(),
                        "rule matched"
                    );
                    return Ok(EvaluationResult::Matched(Match {
                        index,
                        label: rule.label().to_string(),
                        outcome: rule.outcome().clone(),
                    }));
                }
                Ok(false) => {
                    tracing::trace!(
                        table = %self.name,
                        index,
                        label = rule.label(),
                        "rule did not match"
                    );
                }
                Err(failure) => {
                    tracing::warn!(
                        table = %self.name,
                        index,
                        label = rule.label(),
                        predicate = %failure.predicate,
                        error = %failure.source,
                        "push test failed"
                    );
                    return Err(EvaluationError {
                        table: self.name.to_string(),
                        index,
                        label: rule.label().to_string(),
                        predicate: failure.predicate,
                        source: failure.source,
                    });
                }
            }
        }

        tracing::debug!(table = %self.name, repo = %ctx.repo, "no rule matched");
        Ok(EvaluationResult::Unmatched)
    }

    /// Evaluates many pushes in parallel
    ///
    /// Each push gets its own independent walk; results come back in input
    /// order and equal what sequential calls to [`RuleTable::evaluate`] return.
    pub fn evaluate_all(
        &self,
        contexts: &[PushContext],
    ) -> Vec<Result<EvaluationResult<O>, EvaluationError>> {
        contexts.par_iter().map(|ctx| self.evaluate(ctx)).collect()
    }
}

impl<O> fmt::Debug for RuleTable<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self
            .rules
            .read()
            .map(|rules| rules.len())
            .unwrap_or_default();
        f.debug_struct("RuleTable")
            .field("name", &self.name)
            .field("rules", &len)
            .field("sealed", &self.sealed.load(Ordering::SeqCst))
            .finish()
    }
}
