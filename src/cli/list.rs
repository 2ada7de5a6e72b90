//! List command implementation
//!
//! This module implements the `pushrules list` command, which:
//! - Loads the machine from machine.toml
//! - Lists every rule table in the order the machine consults it
//! - Supports both human-readable and JSONL output formats

use crate::cli::args::OutputFormat;
use crate::cli::common::{
    EXIT_ERROR, EXIT_SUCCESS, config_exit_code, load_config, resolve_format,
};
use crate::error::ConfigError;
use crate::output::{ListingHumanFormatter, ListingJsonlFormatter, machine_listing};
use std::path::Path;

/// Error type specific to the list command
#[derive(Debug, thiserror::Error)]
enum ListError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Run the list command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error
/// - 3: Invalid machine.toml
pub fn run_list(config: &Path, format: Option<OutputFormat>) -> i32 {
    match run_list_inner(config, format) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                ListError::Config(e) => config_exit_code(&e),
                ListError::Serialize(_) => EXIT_ERROR,
            }
        }
    }
}

fn run_list_inner(config_path: &Path, format: Option<OutputFormat>) -> Result<(), ListError> {
    let config = load_config(config_path)?;
    let machine = config.build_machine()?;
    let tables = machine_listing(&machine);

    match resolve_format(format, &config) {
        OutputFormat::Human => {
            ListingHumanFormatter::new().write_to_stdout(machine.name(), &tables)
        }
        OutputFormat::Jsonl => ListingJsonlFormatter::new().write_to_stdout(&tables)?,
    }

    Ok(())
}
