//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// puppetsync - compare and migrate Puppet environment state.
#[derive(Parser, Debug)]
#[command(name = "puppetsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Root of the puppet configuration repository.
    #[arg(long, global = true, default_value = "/etc/puppet")]
    pub puppetdir: PathBuf,

    /// Hiera data directory; resolved relative to the puppet root when not
    /// absolute.
    #[arg(long, global = true, default_value = "hiera")]
    pub hieradir: PathBuf,

    /// Enable verbose output (debug logging and detailed report listings).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every environment and the drift between them.
    Report,

    /// Migrate configuration state from one environment into another.
    Migrate {
        /// Environment to migrate from.
        #[arg(long, default_value = "dev")]
        from_env: String,

        /// Environment to migrate into.
        #[arg(long, default_value = "production")]
        to_env: String,
    },

    /// Show the most recent migration journal.
    Journal,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
