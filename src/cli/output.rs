//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying reports,
//! migration results, and journal records in text or JSON. Text rendering
//! embeds no timestamps or other nondeterminism: stable trees format to
//! byte-identical output.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::migrate::{JournalRecord, MigrationReport};
use crate::repo::RepoReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Environment row for table display.
#[derive(Tabled)]
struct EnvRow {
    #[tabled(rename = "Environment")]
    name: String,
    #[tabled(rename = "Modules")]
    modules: usize,
    #[tabled(rename = "Keys")]
    keys: usize,
}

/// Drift row for table display.
#[derive(Tabled)]
struct DriftRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Modules +/-/~")]
    modules: String,
    #[tabled(rename = "Keys +/-/~")]
    keys: String,
}

/// Module row for detailed report display.
#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Module")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Identity")]
    identity: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the repository-wide report.
    #[must_use]
    pub fn format_report(&self, report: &RepoReport, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report, detailed),
        }
    }

    /// Formats the report as text.
    fn format_report_text(report: &RepoReport, detailed: bool) -> String {
        let mut output = String::new();

        if report.environments.is_empty() {
            return String::from("No environments found.\n");
        }

        let rows: Vec<EnvRow> = report
            .environments
            .iter()
            .map(|e| EnvRow {
                name: e.name.clone(),
                modules: e.module_count,
                keys: e.key_count,
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed {
            for env in &report.environments {
                let _ = write!(output, "\nModules in {}:\n", env.name);
                if env.modules.is_empty() {
                    output.push_str("  (none)\n");
                    continue;
                }
                let rows: Vec<ModuleRow> = env
                    .modules
                    .iter()
                    .map(|m| ModuleRow {
                        name: m.name.clone(),
                        kind: m.kind.to_string(),
                        identity: Self::truncate(&m.identity, 12),
                    })
                    .collect();
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
            }
        }

        if !report.drift.is_empty() {
            output.push_str("\nDrift between environments:\n");
            let rows: Vec<DriftRow> = report
                .drift
                .iter()
                .map(|d| DriftRow {
                    source: d.source.clone(),
                    target: d.target.clone(),
                    modules: format!(
                        "{}/{}/{}",
                        d.modules_only_in_source, d.modules_only_in_target, d.modules_differing
                    ),
                    keys: format!(
                        "{}/{}/{}",
                        d.keys_only_in_source, d.keys_only_in_target, d.keys_differing
                    ),
                })
                .collect();
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');

            if report.drift.iter().all(crate::repo::PairDrift::is_clean) {
                let _ = writeln!(output, "\n{} All environments are in sync.", "OK".green());
            }
        }

        output
    }

    /// Formats a migration report.
    #[must_use]
    pub fn format_migration(&self, report: &MigrationReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_migration_text(report),
        }
    }

    /// Formats a migration report as text.
    fn format_migration_text(report: &MigrationReport) -> String {
        let mut output = String::new();

        if report.is_noop() {
            let _ = writeln!(
                output,
                "{} Environments '{}' and '{}' are already in sync.",
                "OK".green(),
                report.source_env,
                report.target_env
            );
            return output;
        }

        let _ = writeln!(
            output,
            "Modules: {} added, {} updated",
            report.modules_added.to_string().green(),
            report.modules_updated.to_string().yellow()
        );
        let _ = writeln!(
            output,
            "Data keys: {} added, {} updated",
            report.keys_added.to_string().green(),
            report.keys_updated.to_string().yellow()
        );
        let _ = writeln!(
            output,
            "Preserved in target: {} module(s), {} key(s)",
            report.comparison.modules_only_in_target.len(),
            report.comparison.keys_only_in_target.len()
        );

        output
    }

    /// Formats a journal record.
    #[must_use]
    pub fn format_journal(&self, record: &JournalRecord) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(record).unwrap_or_default(),
            OutputFormat::Text => Self::format_journal_text(record),
        }
    }

    /// Formats a journal record as text.
    fn format_journal_text(record: &JournalRecord) -> String {
        let mut output = String::new();

        let status = if record.is_complete() {
            "complete".green()
        } else {
            "INCOMPLETE".red()
        };
        let _ = writeln!(
            output,
            "Journal {} ({} -> {}): {status}",
            record.id, record.source_env, record.target_env
        );
        let _ = writeln!(
            output,
            "Applied {}/{} action(s), started {}",
            record.applied_count(),
            record.actions.len(),
            record.started_at
        );

        for action in &record.actions {
            let marker = if action.applied {
                "applied".green()
            } else {
                "pending".red()
            };
            let _ = writeln!(output, "  [{marker}] {} {}", action.kind, action.name);
        }

        output
    }

    /// Truncates a string to `max` characters for table display.
    fn truncate(s: &str, max: usize) -> String {
        if s.chars().count() <= max {
            s.to_string()
        } else {
            let head: String = s.chars().take(max).collect();
            format!("{head}...")
        }
    }
}
