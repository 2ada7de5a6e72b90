//! pushrules CLI entry point

use clap::Parser;
use pushrules::cli::{BatchOptions, Command, args::Cli};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; -v raises the default from warnings to debug
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Command::Init { force, preset } => {
            match pushrules::cli::init::run_init(&cli.config, preset.into(), force) {
                Ok(result) => {
                    for path in &result.created {
                        println!("Created {}.", path);
                    }
                    for path in &result.overwritten {
                        println!("Overwrote {}.", path);
                    }
                    for path in &result.skipped {
                        println!("Skipped {} (already exists; use --force to replace it).", path);
                    }
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    2
                }
            }
        }
        Command::Evaluate {
            pushes,
            project,
            format,
        } => pushrules::cli::evaluate::run_evaluate(&BatchOptions {
            config: &cli.config,
            pushes: &pushes,
            project: project.as_deref(),
            format,
            color: cli.color,
        }),
        Command::Dispose { pushes, format } => {
            pushrules::cli::dispose::run_dispose(&cli.config, &pushes, format, cli.color)
        }
        Command::List { format } => pushrules::cli::list::run_list(&cli.config, format),
    };

    process::exit(exit_code);
}
