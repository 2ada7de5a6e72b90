//! Dispose command implementation
//!
//! `pushrules dispose` runs push documents through the machine's disposal
//! table only. Exit codes follow `pushrules evaluate`.

use crate::cli::args::{ColorChoice, OutputFormat};
use crate::cli::evaluate::{BatchOptions, run_batch};
use crate::engine::Mode;
use std::path::{Path, PathBuf};

/// Run the dispose command
pub fn run_dispose(
    config: &Path,
    pushes: &[PathBuf],
    format: Option<OutputFormat>,
    color: Option<ColorChoice>,
) -> i32 {
    let options = BatchOptions {
        config,
        pushes,
        project: None,
        format,
        color,
    };
    run_batch(&options, Mode::Dispose)
}
