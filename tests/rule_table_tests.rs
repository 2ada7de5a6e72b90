//! Integration tests for first-match rule tables
//!
//! Covers ordering, short-circuiting, failure propagation, registration
//! guards and concurrent evaluation through the public API.

mod common;

use common::push_with_files;
use pushrules::error::{ConfigError, PredicateError};
use pushrules::goals::{GoalOutcome, GoalSet};
use pushrules::machine::BuilderSpec;
use pushrules::rules::{
    all_of, has_spring_boot_application_class, is_maven, material_change_to_java_repo, not,
    push_test, simple_push_test, when_push_satisfies,
};
use pushrules::{EvaluationResult, ProjectSnapshot, PushContext, RuleTable};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

fn library() -> GoalOutcome {
    GoalOutcome::Goals(GoalSet::library())
}

fn failing(name: &str) -> pushrules::rules::PredicateFn {
    push_test(name.to_string(), |_| {
        Err(PredicateError::Failed("repository unavailable".to_string()))
    })
}

fn skip_or_build_table() -> RuleTable<GoalOutcome> {
    let table = RuleTable::new("goals").unwrap();
    table
        .push_rule(
            when_push_satisfies([
                is_maven(),
                has_spring_boot_application_class(),
                not(material_change_to_java_repo()),
            ])
            .it_means("skip")
            .set_goals(GoalOutcome::NoGoals),
        )
        .unwrap()
        .push_rule(
            when_push_satisfies([is_maven()])
                .it_means("build")
                .set_goals(GoalSet::library()),
        )
        .unwrap();
    table
}

fn spring_push(changed: &[&str]) -> PushContext {
    PushContext::new(pushrules::RepoRef::new("acme", "billing"), "master")
        .with_project(
            ProjectSnapshot::new()
                .with_file("pom.xml")
                .with_content(
                    "src/main/java/acme/App.java",
                    "@SpringBootApplication\npublic class App {}\n",
                ),
        )
        .with_changed_files(changed.iter().copied())
}

#[test]
fn test_skip_rule_wins_without_material_change() {
    let table = skip_or_build_table();
    let result = table.evaluate(&spring_push(&["README.md"])).unwrap();

    assert_eq!(result.label(), Some("skip"));
    assert_eq!(result.outcome(), Some(&GoalOutcome::NoGoals));
}

#[test]
fn test_falls_through_to_build_without_spring_class() {
    let table = skip_or_build_table();
    let ctx = push_with_files("plain-lib", &["pom.xml"]);

    let result = table.evaluate(&ctx).unwrap();
    assert_eq!(result.label(), Some("build"));
    assert_eq!(result.into_outcome(), Some(library()));
}

#[test]
fn test_falls_through_on_material_change() {
    let table = skip_or_build_table();
    let result = table
        .evaluate(&spring_push(&["src/main/java/acme/App.java"]))
        .unwrap();
    assert_eq!(result.label(), Some("build"));
}

#[test]
fn test_first_match_beats_later_match() {
    let table = RuleTable::new("goals").unwrap();
    table
        .add_rule([is_maven()], "R1", GoalOutcome::NoGoals)
        .unwrap()
        .add_rule([is_maven()], "R2", library())
        .unwrap();

    for _ in 0..10 {
        let result = table
            .evaluate(&push_with_files("lib", &["pom.xml"]))
            .unwrap();
        assert_eq!(result.label(), Some("R1"));
        match result {
            EvaluationResult::Matched(m) => assert_eq!(m.index, 0),
            EvaluationResult::Unmatched => panic!("expected a match"),
        }
    }
}

#[test]
fn test_short_circuit_skips_failing_predicate() {
    let never = simple_push_test("never", |_| false);
    let table = RuleTable::new("goals").unwrap();
    table
        .add_rule([never, failing("explodes")], "guarded", library())
        .unwrap();

    let result = table.evaluate(&push_with_files("r", &[])).unwrap();
    assert!(!result.is_matched());
}

#[test]
fn test_later_predicates_not_invoked_after_false() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = {
        let calls = Arc::clone(&calls);
        simple_push_test("counted", move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            true
        })
    };

    let table = RuleTable::new("goals").unwrap();
    table
        .add_rule([simple_push_test("never", |_| false), counted], "A", library())
        .unwrap()
        .add_rule([], "fallback", GoalOutcome::NoGoals)
        .unwrap();

    let result = table.evaluate(&push_with_files("r", &[])).unwrap();
    assert_eq!(result.label(), Some("fallback"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_table_never_matches() {
    let table: RuleTable<GoalOutcome> = RuleTable::new("empty").unwrap();
    assert!(table.is_empty());
    for ctx in [push_with_files("a", &[]), push_with_files("b", &["pom.xml"])] {
        assert_eq!(table.evaluate(&ctx).unwrap(), EvaluationResult::Unmatched);
    }
}

#[test]
fn test_catch_all_fires_only_when_nothing_earlier_matches() {
    let table = RuleTable::new("goals").unwrap();
    table
        .add_rule([is_maven()], "maven", library())
        .unwrap()
        .add_rule([], "catch-all", GoalOutcome::DoNotSetAnyGoals)
        .unwrap();

    let maven = table
        .evaluate(&push_with_files("a", &["pom.xml"]))
        .unwrap();
    assert_eq!(maven.label(), Some("maven"));

    let other = table
        .evaluate(&push_with_files("b", &["Makefile"]))
        .unwrap();
    assert_eq!(other.label(), Some("catch-all"));
    assert_eq!(other.outcome(), Some(&GoalOutcome::DoNotSetAnyGoals));
}

#[test]
fn test_predicate_failure_identifies_rule() {
    let table = RuleTable::new("goals").unwrap();
    table
        .add_rule([is_maven()], "maven", GoalOutcome::NoGoals)
        .unwrap()
        .add_rule([failing("flaky-scan")], "X", library())
        .unwrap()
        .add_rule([], "fallback", GoalOutcome::NoGoals)
        .unwrap();

    let err = table
        .evaluate(&push_with_files("r", &["Makefile"]))
        .unwrap_err();

    assert_eq!(err.table, "goals");
    assert_eq!(err.index, 1);
    assert_eq!(err.label, "X");
    assert_eq!(err.predicate, "flaky-scan");
    assert!(matches!(err.source, PredicateError::Failed(_)));
    assert!(err.to_string().contains("rule #1 'X'"));
}

#[test]
fn test_invalid_outcome_rejected_at_registration() {
    let table = RuleTable::new("build").unwrap();
    let err = table
        .add_rule([is_maven()], "nameless", BuilderSpec::new("", ["mvn package"]))
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidOutcome { ref label, .. } if label == "nameless"));
    assert!(table.is_empty());
}

#[test]
fn test_sealed_table_rejects_registration() {
    let table = RuleTable::new("goals").unwrap();
    table.add_rule([is_maven()], "maven", library()).unwrap();
    table.seal();

    let err = table
        .add_rule([], "late", GoalOutcome::NoGoals)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Sealed { ref label, .. } if label == "late"));
    assert_eq!(table.len(), 1);

    // Sealing does not affect evaluation.
    let result = table.evaluate(&push_with_files("r", &["pom.xml"])).unwrap();
    assert_eq!(result.label(), Some("maven"));
}

#[test]
fn test_registration_during_evaluation_fails() {
    let table: Arc<RuleTable<GoalOutcome>> = Arc::new(RuleTable::new("goals").unwrap());
    let slot: Arc<OnceLock<Weak<RuleTable<GoalOutcome>>>> = Arc::new(OnceLock::new());
    let seen: Arc<OnceLock<String>> = Arc::new(OnceLock::new());

    let reentrant = {
        let slot = Arc::clone(&slot);
        let seen = Arc::clone(&seen);
        push_test("registers-a-rule", move |_| {
            if let Some(table) = slot.get().and_then(Weak::upgrade) {
                let outcome = table.add_rule([], "late", GoalOutcome::NoGoals);
                if let Err(e) = outcome {
                    let _ = seen.set(e.to_string());
                    if matches!(e, ConfigError::TableInUse { .. }) {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        })
    };

    table.add_rule([reentrant], "mutator", library()).unwrap();
    slot.set(Arc::downgrade(&table)).unwrap();

    let result = table.evaluate(&push_with_files("r", &[])).unwrap();
    assert_eq!(result.label(), Some("mutator"));
    assert!(seen.get().unwrap().contains("is being evaluated"));
    assert_eq!(table.len(), 1);

    // Once the evaluation is over, registration is open again.
    table.add_rule([], "after", GoalOutcome::NoGoals).unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn test_concurrent_evaluation_matches_sequential() {
    let table = RuleTable::new("goals").unwrap();
    table
        .add_rule(
            [all_of([is_maven(), simple_push_test("on-master", |c| c.branch == "master")])],
            "maven on master",
            library(),
        )
        .unwrap()
        .add_rule([is_maven()], "maven elsewhere", GoalOutcome::NoGoals)
        .unwrap();

    let contexts: Vec<PushContext> = (0..200)
        .map(|i| {
            let files: &[&str] = if i % 3 == 0 { &["Makefile"] } else { &["pom.xml"] };
            let branch = if i % 2 == 0 { "master" } else { "feature" };
            PushContext::new(pushrules::RepoRef::new("acme", format!("repo-{i}")), branch)
                .with_project(ProjectSnapshot::new().with_files(files.iter().copied()))
        })
        .collect();

    let sequential: Vec<_> = contexts
        .iter()
        .map(|ctx| table.evaluate(ctx).unwrap())
        .collect();
    let parallel: Vec<_> = table
        .evaluate_all(&contexts)
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(sequential, parallel);
    assert_eq!(parallel[0].label(), None);
    assert_eq!(parallel[1].label(), Some("maven elsewhere"));
    assert_eq!(parallel[2].label(), Some("maven on master"));
}

#[test]
fn test_concurrent_evaluation_from_threads() {
    let table = Arc::new(skip_or_build_table());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                let ctx = if i % 2 == 0 {
                    spring_push(&["README.md"])
                } else {
                    push_with_files("lib", &["pom.xml"])
                };
                (i, table.evaluate(&ctx).unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (i, result) = handle.join().unwrap();
        let expected = if i % 2 == 0 { "skip" } else { "build" };
        assert_eq!(result.label(), Some(expected));
    }
}
