//! CLI argument parsing and command dispatch

pub mod args;
pub mod common;
pub mod dispose;
pub mod evaluate;
pub mod init;
pub mod list;

// Re-export types for convenient access
pub use args::{Cli, ColorChoice, Command, OutputFormat, PresetArg};
pub use evaluate::BatchOptions;
