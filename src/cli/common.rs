//! Common helper functions shared across CLI commands
//!
//! This module provides shared functionality for loading configuration,
//! resolving output settings, and mapping failures to exit codes.

use crate::cli::args::{ColorChoice, OutputFormat};
use crate::config::{ColorOption, MachineConfig, OutputFormat as ConfiguredFormat};
use crate::engine::ExecutionResult;
use crate::error::{ConfigError, PushRulesError};
use std::io::IsTerminal;
use std::path::Path;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_EVALUATION_ERROR: i32 = 1;
pub const EXIT_ERROR: i32 = 2;
pub const EXIT_PARSE_ERROR: i32 = 3;

/// Load machine.toml configuration
///
/// # Errors
///
/// Returns `ConfigError::Io` if the file does not exist or cannot be read.
/// Returns `ConfigError::Parse` if the file is not valid TOML, and the other
/// `ConfigError` variants if it does not validate.
pub(crate) fn load_config(path: &Path) -> Result<MachineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "{} not found. Run 'pushrules init' to create it.",
                path.display()
            ),
        )));
    }

    MachineConfig::load(path)
}

/// Command-line format if given, else the configured one
pub(crate) fn resolve_format(flag: Option<OutputFormat>, config: &MachineConfig) -> OutputFormat {
    flag.unwrap_or(match config.output.format {
        ConfiguredFormat::Human => OutputFormat::Human,
        ConfiguredFormat::Jsonl => OutputFormat::Jsonl,
    })
}

/// Command-line colour if given, else the configured one
///
/// `auto` only colours when stdout is a terminal.
pub(crate) fn resolve_color(
    flag: Option<ColorChoice>,
    config: &MachineConfig,
) -> termcolor::ColorChoice {
    let choice = flag.unwrap_or(match config.output.color {
        ColorOption::Auto => ColorChoice::Auto,
        ColorOption::Always => ColorChoice::Always,
        ColorOption::Never => ColorChoice::Never,
    });
    match choice {
        ColorChoice::Always => termcolor::ColorChoice::Always,
        ColorChoice::Never => termcolor::ColorChoice::Never,
        ColorChoice::Auto if std::io::stdout().is_terminal() => termcolor::ColorChoice::Auto,
        ColorChoice::Auto => termcolor::ColorChoice::Never,
    }
}

/// Exit code for a configuration failure
pub(crate) fn config_exit_code(error: &ConfigError) -> i32 {
    match error {
        ConfigError::Parse(_) => EXIT_PARSE_ERROR,
        _ => EXIT_ERROR,
    }
}

/// Exit code for a single failed push
pub(crate) fn push_exit_code(error: &PushRulesError) -> i32 {
    match error {
        PushRulesError::Evaluation(_) => EXIT_EVALUATION_ERROR,
        PushRulesError::Push { .. } => EXIT_PARSE_ERROR,
        PushRulesError::Config(e) => config_exit_code(e),
        PushRulesError::Snapshot(_) | PushRulesError::Io(_) => EXIT_ERROR,
    }
}

/// Exit code for a batch: the most severe failure, or success
///
/// Unmatched pushes are not failures.
pub(crate) fn batch_exit_code(result: &ExecutionResult) -> i32 {
    result
        .reports
        .iter()
        .filter_map(|report| report.result.as_ref().err())
        .map(push_exit_code)
        .max()
        .unwrap_or(EXIT_SUCCESS)
}
