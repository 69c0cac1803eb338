//! CLI module for the puppetsync tool.
//!
//! This module provides the command-line interface for comparing and
//! migrating Puppet environments.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
