//! CLI argument parsing using clap

use crate::machine::Preset;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for pushrules commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON Lines format (one JSON object per line)
    Jsonl,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Automatically detect if terminal supports color
    Auto,
    /// Always use color
    Always,
    /// Never use color
    Never,
}

/// Preset names accepted by `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    CloudFoundry,
    K8s,
    ArtifactVerifying,
    StaticAnalysis,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::CloudFoundry => Preset::CloudFoundry,
            PresetArg::K8s => Preset::K8s,
            PresetArg::ArtifactVerifying => Preset::ArtifactVerifying,
            PresetArg::StaticAnalysis => Preset::StaticAnalysis,
        }
    }
}

/// pushrules CLI main entry point
#[derive(Parser, Debug)]
#[command(name = "pushrules")]
#[command(about = "First-match goal resolution for push-driven delivery machines")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Machine configuration file
    #[arg(long, global = true, default_value = "machine.toml")]
    pub config: PathBuf,

    /// Output coloring (defaults to the configured [output] color)
    #[arg(long, global = true)]
    pub color: Option<ColorChoice>,

    /// Log rule evaluation to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available pushrules subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter machine.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,

        /// Preset the machine builds on
        #[arg(long, default_value = "cloud-foundry")]
        preset: PresetArg,
    },

    /// Decide goals, builder and deployers for push documents
    Evaluate {
        /// Push documents (JSON)
        #[arg(required = true)]
        pushes: Vec<PathBuf>,

        /// Checkout to snapshot as the project of every push
        #[arg(long)]
        project: Option<PathBuf>,

        /// Output format (defaults to the configured [output] format)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Decide disposal goals for push documents
    Dispose {
        /// Push documents (JSON)
        #[arg(required = true)]
        pushes: Vec<PathBuf>,

        /// Output format (defaults to the configured [output] format)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// List every rule table in evaluation order
    List {
        /// Output format (defaults to the configured [output] format)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },
}
