//! Error types for pushrules
//!
//! This module defines the error types used throughout pushrules. Errors are
//! split by the phase they occur in: configuration errors are raised while
//! assembling a machine, predicate and evaluation errors while a push is being
//! evaluated.

use std::path::PathBuf;

/// Configuration and registration errors
///
/// Raised during setup (building rule tables, loading `machine.toml`), never
/// deferred into steady-state evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration syntax
    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration failed semantic validation
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// Rule registered after the table was sealed
    #[error("Rule table '{table}' is sealed; rule '{label}' cannot be added")]
    Sealed { table: String, label: String },

    /// Rule registered while an evaluation was walking the table
    #[error("Rule table '{table}' is being evaluated; rule '{label}' cannot be added")]
    TableInUse { table: String, label: String },

    /// Outcome has a shape the engine does not accept
    #[error("Invalid outcome for rule '{label}': {message}")]
    InvalidOutcome { label: String, message: String },

    /// Push test name does not resolve to a known push test
    #[error("Unknown push test: {0}")]
    UnknownPushTest(String),

    /// Goal key does not resolve to a catalog goal
    #[error("Unknown goal: {0}")]
    UnknownGoal(String),

    /// Goal set name does not resolve to a standard or configured goal set
    #[error("Unknown goal set: {0}")]
    UnknownGoalSet(String),

    /// Invalid glob pattern in a push test
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Invalid regex pattern in a push test
    #[error("Invalid regex pattern '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// Failure of a single push test
#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    /// Reading project content failed
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The snapshot has neither inline content nor a checkout for this file
    #[error("content of '{0}' is not available in the project snapshot")]
    ContentUnavailable(String),

    /// A custom push test reported a failure
    #[error("{0}")]
    Failed(String),
}

/// A push test failed while a rule table was being evaluated
///
/// Identifies the failing rule by position and label so operators can find it
/// in the table.
#[derive(Debug, thiserror::Error)]
#[error("rule #{index} '{label}' failed in push test '{predicate}' of table '{table}': {source}")]
pub struct EvaluationError {
    /// Name of the table being evaluated
    pub table: String,
    /// Zero-based position of the rule in the table
    pub index: usize,
    /// Label of the rule
    pub label: String,
    /// Name of the push test that failed
    pub predicate: String,
    /// Underlying failure
    #[source]
    pub source: PredicateError,
}

/// Errors raised while snapshotting a project checkout
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("Checkout root does not exist: {0}")]
    MissingRoot(PathBuf),
}

/// Top-level error type for pushrules
#[derive(Debug, thiserror::Error)]
pub enum PushRulesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Snapshot error
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Push document could not be parsed
    #[error("Invalid push document {file}: {message}")]
    Push { file: PathBuf, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
