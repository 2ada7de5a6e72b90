//! Evaluate command implementation
//!
//! This module implements the `pushrules evaluate` command, which:
//! - Loads the machine from machine.toml
//! - Optionally snapshots one checkout as the project of every push
//! - Evaluates the push documents in parallel
//! - Formats the plans (human or JSONL)
//! - Returns an exit code reflecting the most severe failure

use crate::cli::args::{ColorChoice, OutputFormat};
use crate::cli::common::{
    EXIT_ERROR, batch_exit_code, config_exit_code, load_config, resolve_color, resolve_format,
};
use crate::engine::{ExecutionEngine, ExecutionResult, Mode};
use crate::error::{ConfigError, SnapshotError};
use crate::output::{HumanFormatter, JsonlFormatter};
use crate::push::ProjectSnapshot;
use std::path::{Path, PathBuf};

/// Error type specific to the evaluate and dispose commands
#[derive(Debug, thiserror::Error)]
pub(crate) enum EvaluateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options shared by the evaluate and dispose commands
#[derive(Debug, Clone)]
pub struct BatchOptions<'a> {
    pub config: &'a Path,
    pub pushes: &'a [PathBuf],
    pub project: Option<&'a Path>,
    pub format: Option<OutputFormat>,
    pub color: Option<ColorChoice>,
}

/// Run the evaluate command
///
/// # Returns
///
/// Exit code:
/// - 0: Every push was evaluated (matched or not)
/// - 1: A push test failed during evaluation
/// - 2: Configuration, snapshot or I/O error
/// - 3: Invalid machine.toml or push document
pub fn run_evaluate(options: &BatchOptions<'_>) -> i32 {
    run_batch(options, Mode::Plan)
}

/// Runs a batch in `mode` and maps the outcome to an exit code
pub(crate) fn run_batch(options: &BatchOptions<'_>, mode: Mode) -> i32 {
    match run_batch_inner(options, mode) {
        Ok(result) => {
            for report in &result.reports {
                if let Err(e) = &report.result {
                    tracing::warn!(source = %report.source.display(), error = %e, "push failed");
                }
            }
            batch_exit_code(&result)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                EvaluateError::Config(e) => config_exit_code(&e),
                _ => EXIT_ERROR,
            }
        }
    }
}

fn run_batch_inner(
    options: &BatchOptions<'_>,
    mode: Mode,
) -> Result<ExecutionResult, EvaluateError> {
    // 1. Load machine.toml and assemble the machine
    let config = load_config(options.config)?;
    let machine = config.build_machine()?;
    tracing::info!(machine = machine.name(), "machine assembled");

    // 2. Snapshot the shared checkout, if one was given
    let mut engine = ExecutionEngine::new(machine).with_exclude(config.project.exclude.clone());
    if let Some(root) = options.project {
        let snapshot = ProjectSnapshot::from_dir(root, &config.project.exclude)?;
        tracing::debug!(root = %root.display(), files = snapshot.len(), "project snapshotted");
        engine = engine.with_project(snapshot);
    }

    // 3. Evaluate every push
    let result = engine.execute(options.pushes, mode);

    // 4. Format output
    match resolve_format(options.format, &config) {
        OutputFormat::Human => {
            HumanFormatter::new(resolve_color(options.color, &config)).write_to_stdout(&result)?
        }
        OutputFormat::Jsonl => JsonlFormatter::new().write_to_stdout(&result),
    }

    Ok(result)
}
