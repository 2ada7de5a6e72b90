#![forbid(unsafe_code)]

//! Rules and the fluent rule-building DSL
//!
//! A rule is an ordered conjunction of push tests, a label describing what a
//! match means, and the outcome a match produces. Rules are immutable once
//! built; the DSL reads the way tables are written:
//!
//! ```
//! use pushrules::goals::GoalOutcome;
//! use pushrules::rules::{is_maven, material_change_to_java_repo, not, when_push_satisfies};
//!
//! let rule = when_push_satisfies([is_maven(), not(material_change_to_java_repo())])
//!     .it_means("No material change to Java")
//!     .set_goals(GoalOutcome::NoGoals);
//! assert_eq!(rule.label(), "No material change to Java");
//! ```

use crate::error::PredicateError;
use crate::goals::GoalOutcome;
use crate::push::PushContext;
use crate::rules::predicate::PredicateFn;
use std::collections::HashSet;

/// Requirements on values a rule table hands out
///
/// `validate` is called when a rule is registered so that malformed outcomes
/// are rejected during setup rather than surfacing during evaluation.
pub trait Outcome: Clone + Send + Sync {
    /// Checks the outcome's shape; the error message is reported with the rule label
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// One-line description used in listings
    fn describe(&self) -> String;
}

impl Outcome for GoalOutcome {
    fn validate(&self) -> Result<(), String> {
        let GoalOutcome::Goals(set) = self else {
            return Ok(());
        };
        if set.goals().is_empty() {
            return Err(format!("goal set '{}' is empty", set.name()));
        }
        let mut seen = HashSet::new();
        for goal in set.goals() {
            if !seen.insert(goal.key()) {
                return Err(format!(
                    "goal set '{}' repeats goal '{}'",
                    set.name(),
                    goal.key()
                ));
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// The push test that failed while a rule was being matched
#[derive(Debug)]
pub(crate) struct RuleFailure {
    pub(crate) predicate: String,
    pub(crate) source: PredicateError,
}

/// A predicate-guarded outcome
#[derive(Debug, Clone)]
pub struct Rule<O> {
    predicates: Vec<PredicateFn>,
    label: String,
    outcome: O,
}

impl<O> Rule<O> {
    /// Creates a rule; no predicates means the rule matches every push
    pub fn new<I>(predicates: I, label: impl Into<String>, outcome: O) -> Self
    where
        I: IntoIterator<Item = PredicateFn>,
    {
        Self {
            predicates: predicates.into_iter().collect(),
            label: label.into(),
            outcome,
        }
    }

    pub fn predicates(&self) -> &[PredicateFn] {
        &self.predicates
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn outcome(&self) -> &O {
        &self.outcome
    }

    /// Names of the rule's push tests, in evaluation order
    pub fn predicate_names(&self) -> Vec<&str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    /// Tests the predicates left to right, stopping at the first `false`
    pub(crate) fn matches(&self, ctx: &PushContext) -> Result<bool, RuleFailure> {
        for predicate in &self.predicates {
            match predicate.test(ctx) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(source) => {
                    return Err(RuleFailure {
                        predicate: predicate.name().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(true)
    }
}

/// First step of the DSL: the push tests a rule requires
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    predicates: Vec<PredicateFn>,
}

/// Second step of the DSL: push tests plus a label
#[derive(Debug, Clone)]
pub struct LabeledRule {
    predicates: Vec<PredicateFn>,
    label: String,
}

/// Starts a rule that applies when every given push test holds
pub fn when_push_satisfies<I>(predicates: I) -> RuleBuilder
where
    I: IntoIterator<Item = PredicateFn>,
{
    RuleBuilder {
        predicates: predicates.into_iter().collect(),
    }
}

impl RuleBuilder {
    /// Describes what a match means
    pub fn it_means(self, label: impl Into<String>) -> LabeledRule {
        LabeledRule {
            predicates: self.predicates,
            label: label.into(),
        }
    }

    /// Finishes the rule without a description; the label lists the push tests
    pub fn set_goals(self, outcome: impl Into<GoalOutcome>) -> Rule<GoalOutcome> {
        let label = self.default_label();
        Rule::new(self.predicates, label, outcome.into())
    }

    fn default_label(&self) -> String {
        if self.predicates.is_empty() {
            return "any push".to_string();
        }
        let names: Vec<&str> = self.predicates.iter().map(|p| p.name()).collect();
        names.join(" && ")
    }
}

impl LabeledRule {
    /// Finishes a goal-setting rule
    pub fn set_goals(self, outcome: impl Into<GoalOutcome>) -> Rule<GoalOutcome> {
        Rule::new(self.predicates, self.label, outcome.into())
    }

    /// Finishes a rule with any outcome type (builders, deployers)
    pub fn set<O>(self, outcome: O) -> Rule<O> {
        Rule::new(self.predicates, self.label, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalSet;
    use crate::rules::predicate::{push_test, simple_push_test};
    use crate::types::RepoRef;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> PushContext {
        PushContext::new(RepoRef::new("o", "r"), "master")
    }

    #[test]
    fn test_dsl_builds_rule() {
        let rule = when_push_satisfies([simple_push_test("yes", |_| true)])
            .it_means("Build Java")
            .set_goals(GoalSet::library());

        assert_eq!(rule.label(), "Build Java");
        assert_eq!(rule.predicate_names(), vec!["yes"]);
        assert_eq!(rule.outcome(), &GoalOutcome::Goals(GoalSet::library()));
    }

    #[test]
    fn test_default_label() {
        let rule = when_push_satisfies([
            simple_push_test("is-maven", |_| true),
            simple_push_test("to-default-branch", |_| true),
        ])
        .set_goals(GoalOutcome::NoGoals);
        assert_eq!(rule.label(), "is-maven && to-default-branch");

        let catch_all = when_push_satisfies(Vec::new()).set_goals(GoalOutcome::NoGoals);
        assert_eq!(catch_all.label(), "any push");
    }

    #[test]
    fn test_generic_outcome() {
        let rule = when_push_satisfies(Vec::new()).it_means("builder").set("mvn package");
        assert_eq!(*rule.outcome(), "mvn package");
    }

    #[test]
    fn test_zero_predicates_match() {
        let rule = Rule::new(Vec::new(), "catch-all", ());
        assert!(rule.matches(&ctx()).unwrap());
    }

    #[test]
    fn test_matches_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let counted = push_test("counted", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        });

        let rule = Rule::new(
            [simple_push_test("no", |_| false), counted],
            "never",
            (),
        );
        assert!(!rule.matches(&ctx()).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_matches_reports_failing_predicate() {
        let rule = Rule::new(
            [
                simple_push_test("yes", |_| true),
                push_test("broken", |_| Err(PredicateError::Failed("down".into()))),
            ],
            "X",
            (),
        );
        let failure = rule.matches(&ctx()).unwrap_err();
        assert_eq!(failure.predicate, "broken");
        assert_eq!(failure.source.to_string(), "down");
    }

    #[test]
    fn test_goal_outcome_validation() {
        assert!(GoalOutcome::NoGoals.validate().is_ok());
        assert!(GoalOutcome::DoNotSetAnyGoals.validate().is_ok());
        assert!(GoalOutcome::Goals(GoalSet::http_service()).validate().is_ok());
    }
}
