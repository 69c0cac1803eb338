//! puppetsync CLI entrypoint.
//!
//! This is the main entrypoint for the puppetsync command-line tool.

use std::process::ExitCode;

use puppetsync::cli::{Cli, Commands, OutputFormatter};
use puppetsync::error::Result;
use puppetsync::repo::{PuppetConfigRepo, RepoConfig};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatches the parsed command line.
fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    let config = RepoConfig::resolve(cli.puppetdir, &cli.hieradir);
    debug!(
        "Puppet root: {}, hiera root: {}",
        config.puppet_root.display(),
        config.hiera_root.display()
    );
    let repo = PuppetConfigRepo::new(config)?;

    match cli.command {
        Commands::Report => cmd_report(&repo, cli.verbose, &formatter),
        Commands::Migrate { from_env, to_env } => {
            cmd_migrate(&repo, &from_env, &to_env, &formatter)
        }
        Commands::Journal => cmd_journal(&repo, &formatter),
    }
}

/// Shows every environment and the drift between them.
fn cmd_report(repo: &PuppetConfigRepo, detailed: bool, formatter: &OutputFormatter) -> Result<()> {
    let report = repo.report()?;
    print!("{}", formatter.format_report(&report, detailed));
    Ok(())
}

/// Migrates configuration state between two environments.
fn cmd_migrate(
    repo: &PuppetConfigRepo,
    from_env: &str,
    to_env: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let report = repo.migrate(from_env, to_env)?;
    print!("{}", formatter.format_migration(&report));
    println!("Migration between {from_env} and {to_env} completed successfully");
    Ok(())
}

/// Shows the most recent migration journal.
fn cmd_journal(repo: &PuppetConfigRepo, formatter: &OutputFormatter) -> Result<()> {
    match repo.latest_journal()? {
        Some(record) => print!("{}", formatter.format_journal(&record)),
        None => println!("No migration journal found."),
    }
    Ok(())
}
