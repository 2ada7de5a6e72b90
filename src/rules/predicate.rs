#![forbid(unsafe_code)]

//! The push test trait and closure-backed push tests

use crate::error::PredicateError;
use crate::push::PushContext;
use std::fmt;
use std::sync::Arc;

/// A named predicate over a push
///
/// Push tests must not mutate anything observable through the context; they
/// only receive a shared borrow of it. A push test may read project content,
/// which can fail: failures are reported as `PredicateError` and are never
/// the same thing as answering `false`.
///
/// The trait is `Send + Sync` so one table can serve concurrent evaluations.
pub trait PushTest: Send + Sync {
    /// Name shown in listings, logs and evaluation errors
    fn name(&self) -> &str;

    /// Evaluates the test against a push
    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError>;
}

/// Shared handle to a push test, as stored in rules
pub type PredicateFn = Arc<dyn PushTest>;

impl fmt::Debug for dyn PushTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PushTest({})", self.name())
    }
}

struct FnPushTest<F> {
    name: String,
    f: F,
}

impl<F> PushTest for FnPushTest<F>
where
    F: Fn(&PushContext) -> Result<bool, PredicateError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, ctx: &PushContext) -> Result<bool, PredicateError> {
        (self.f)(ctx)
    }
}

/// Wraps a fallible closure as a push test
pub fn push_test<F>(name: impl Into<String>, f: F) -> PredicateFn
where
    F: Fn(&PushContext) -> Result<bool, PredicateError> + Send + Sync + 'static,
{
    Arc::new(FnPushTest {
        name: name.into(),
        f,
    })
}

/// Wraps an infallible closure as a push test
pub fn simple_push_test<F>(name: impl Into<String>, f: F) -> PredicateFn
where
    F: Fn(&PushContext) -> bool + Send + Sync + 'static,
{
    push_test(name, move |ctx| Ok(f(ctx)))
}
