#![forbid(unsafe_code)]

//! pushrules: first-match goal resolution for software delivery machines
//!
//! A push to a repository is run through ordered rule tables. The first rule
//! whose push tests all hold decides the outcome: which goals the push gets,
//! which builder builds it, which deployer fulfils each deployment goal, and
//! which goals apply when the repository is disposed of.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod goals;
pub mod machine;
pub mod output;
pub mod push;
pub mod rules;
pub mod types;

// Re-export error types for convenient access
pub use error::{ConfigError, EvaluationError, PredicateError, PushRulesError, SnapshotError};

// Re-export core domain types for convenient access
pub use goals::{Goal, GoalOutcome, GoalSet};
pub use machine::{MachineBuilder, PushPlan, SoftwareDeliveryMachine};
pub use push::{ProjectSnapshot, PushContext};
pub use rules::{EvaluationResult, Match, Outcome, PushTest, Rule, RuleTable};
pub use types::{Environment, RepoRef, TableName, Visibility};
