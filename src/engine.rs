//! Batch evaluation of push documents

pub mod executor;

pub use executor::{DisposalPlan, ExecutionEngine, ExecutionResult, Mode, PushReport, Verdict};
