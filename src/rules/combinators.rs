#![forbid(unsafe_code)]

//! Composition of push tests
//!
//! All combinators evaluate their operands left to right, one at a time, and
//! stop as soon as the answer is known. A failing operand fails the whole
//! combination.

use crate::error::PredicateError;
use crate::push::PushContext;
use crate::rules::predicate::{PredicateFn, PushTest};
use std::sync::Arc;

struct AllOf {
    name: String,
    tests: Vec<PredicateFn>,
}

impl PushTest for AllOf {
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        for test in &self.tests {
            if !test.test(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

struct AnyOf {
    name: String,
    tests: Vec<PredicateFn>,
}

impl PushTest for AnyOf {
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        for test in &self.tests {
            if test.test(ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

struct Not {
    name: String,
    test: PredicateFn,
}

impl PushTest for Not {
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        Ok(!self.test.test(ctx)?)
    }
}

fn joined_name(op: &str, tests: &[PredicateFn]) -> String {
    let names: Vec<&str> = tests.iter().map(|t| t.name()).collect();
    format!("{}({})", op, names.join(", "))
}

/// Conjunction: true when every test holds; true for no tests
pub fn all_of<I>(tests: I) -> PredicateFn
where
    I: IntoIterator<Item = PredicateFn>,
{
    let tests: Vec<PredicateFn> = tests.into_iter().collect();
    Arc::new(AllOf {
        name: joined_name("all", &tests),
        tests,
    })
}

/// Disjunction: true when any test holds; false for no tests
pub fn any_of<I>(tests: I) -> PredicateFn
where
    I: IntoIterator<Item = PredicateFn>,
{
    let tests: Vec<PredicateFn> = tests.into_iter().collect();
    Arc::new(AnyOf {
        name: joined_name("any", &tests),
        tests,
    })
}

/// Negation
pub fn not(test: PredicateFn) -> PredicateFn {
    Arc::new(Not {
        name: format!("not({})", test.name()),
        test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::predicate::{push_test, simple_push_test};
    use crate::types::RepoRef;

    fn ctx() -> PushContext {
        PushContext::new(RepoRef::new("o", "r"), "master")
    }

    fn yes() -> PredicateFn {
        simple_push_test("yes", |_| true)
    }

    fn no() -> PredicateFn {
        simple_push_test("no", |_| false)
    }

    fn explodes() -> PredicateFn {
        push_test("explodes", |_| Err(PredicateError::Failed("kaboom".into())))
    }

    #[test]
    fn test_all_of() {
        assert!(all_of([yes(), yes()]).test(&ctx()).unwrap());
        assert!(!all_of([yes(), no()]).test(&ctx()).unwrap());
        assert!(all_of(Vec::new()).test(&ctx()).unwrap());
    }

    #[test]
    fn test_all_of_short_circuits_before_failure() {
        assert!(!all_of([no(), explodes()]).test(&ctx()).unwrap());
        assert!(all_of([yes(), explodes()]).test(&ctx()).is_err());
    }

    #[test]
    fn test_any_of() {
        assert!(any_of([no(), yes()]).test(&ctx()).unwrap());
        assert!(!any_of([no(), no()]).test(&ctx()).unwrap());
        assert!(!any_of(Vec::new()).test(&ctx()).unwrap());
    }

    #[test]
    fn test_any_of_short_circuits_before_failure() {
        assert!(any_of([yes(), explodes()]).test(&ctx()).unwrap());
        assert!(any_of([no(), explodes()]).test(&ctx()).is_err());
    }

    #[test]
    fn test_not() {
        assert!(!not(yes()).test(&ctx()).unwrap());
        assert!(not(no()).test(&ctx()).unwrap());
        assert!(not(explodes()).test(&ctx()).is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(all_of([yes(), not(no())]).name(), "all(yes, not(no))");
        assert_eq!(any_of([yes(), no()]).name(), "any(yes, no)");
    }
}
