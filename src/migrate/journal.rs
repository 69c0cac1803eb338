//! Write-ahead migration journal.
//!
//! Before a plan executes, the planned actions are recorded under
//! `<puppet_root>/.puppetsync/`; each action is marked applied as it
//! completes and the record is marked complete on success. The engine never
//! reads the journal back itself: it exists for operator-driven recovery
//! after a partial migration.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::MigrateError;

use super::plan::{ActionKind, MigrationPlan};

/// Directory under the puppet root holding journal records.
pub const JOURNAL_DIR: &str = ".puppetsync";

/// One planned action as recorded in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalAction {
    /// Action type.
    pub kind: ActionKind,
    /// Module name or data key.
    pub name: String,
    /// Whether the action has been applied.
    pub applied: bool,
}

/// A persisted journal record for one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Unique id of this migration run.
    pub id: Uuid,
    /// When execution started.
    pub started_at: DateTime<Utc>,
    /// When execution completed, if it did.
    pub completed_at: Option<DateTime<Utc>>,
    /// Source environment name.
    pub source_env: String,
    /// Target environment name.
    pub target_env: String,
    /// Planned actions with applied-markers.
    pub actions: Vec<JournalAction>,
}

impl JournalRecord {
    /// Number of actions marked applied.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.actions.iter().filter(|a| a.applied).count()
    }

    /// True when the run completed cleanly.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Live journal handle for one migration run.
#[derive(Debug)]
pub struct MigrationJournal {
    /// Path of the journal file.
    path: PathBuf,
    /// In-memory record, flushed after every change.
    record: JournalRecord,
}

impl MigrationJournal {
    /// Records a plan before execution starts.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Journal`] when the journal directory or file
    /// cannot be written.
    pub fn begin(puppet_root: &Path, plan: &MigrationPlan) -> Result<Self, MigrateError> {
        let dir = puppet_root.join(JOURNAL_DIR);
        std::fs::create_dir_all(&dir)
            .map_err(|e| MigrateError::journal(format!("failed to create {}: {e}", dir.display())))?;

        let record = JournalRecord {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            source_env: plan.source_env.clone(),
            target_env: plan.target_env.clone(),
            actions: plan
                .actions
                .iter()
                .map(|a| JournalAction {
                    kind: a.kind,
                    name: a.name.clone(),
                    applied: false,
                })
                .collect(),
        };

        let path = dir.join(format!("journal-{}.json", record.id));
        let journal = Self { path, record };
        journal.flush()?;

        info!("Journal started: {}", journal.path.display());
        Ok(journal)
    }

    /// Marks the action at `index` as applied and persists the record.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Journal`] on write failure or an index out
    /// of range.
    pub fn mark_applied(&mut self, index: usize) -> Result<(), MigrateError> {
        let action = self
            .record
            .actions
            .get_mut(index)
            .ok_or_else(|| MigrateError::journal(format!("no action at index {index}")))?;
        action.applied = true;
        self.flush()
    }

    /// Marks the run complete and persists the record.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Journal`] on write failure.
    pub fn complete(mut self) -> Result<(), MigrateError> {
        self.record.completed_at = Some(Utc::now());
        self.flush()?;
        debug!("Journal completed: {}", self.path.display());
        Ok(())
    }

    /// Writes the record to disk.
    fn flush(&self) -> Result<(), MigrateError> {
        let rendered = serde_json::to_string_pretty(&self.record)
            .map_err(|e| MigrateError::journal(e.to_string()))?;
        std::fs::write(&self.path, rendered).map_err(|e| {
            MigrateError::journal(format!("failed to write {}: {e}", self.path.display()))
        })
    }

    /// Loads the most recently started journal record, if any exist.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Journal`] when the directory is unreadable
    /// or a record fails to parse.
    pub fn latest(puppet_root: &Path) -> Result<Option<JournalRecord>, MigrateError> {
        let dir = puppet_root.join(JOURNAL_DIR);
        if !dir.is_dir() {
            return Ok(None);
        }

        let entries = std::fs::read_dir(&dir)
            .map_err(|e| MigrateError::journal(format!("failed to read {}: {e}", dir.display())))?;

        let mut newest: Option<JournalRecord> = None;
        for entry in entries {
            let entry =
                entry.map_err(|e| MigrateError::journal(format!("failed to read entry: {e}")))?;
            let path = entry.path();
            let is_journal = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("journal-") && n.ends_with(".json"));
            if !is_journal {
                continue;
            }

            let content = std::fs::read_to_string(&path).map_err(|e| {
                MigrateError::journal(format!("failed to read {}: {e}", path.display()))
            })?;
            let record: JournalRecord = serde_json::from_str(&content).map_err(|e| {
                MigrateError::journal(format!("malformed journal {}: {e}", path.display()))
            })?;

            if newest
                .as_ref()
                .is_none_or(|n| record.started_at > n.started_at)
            {
                newest = Some(record);
            }
        }

        Ok(newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::plan::MigrationAction;
    use tempfile::TempDir;

    fn plan(actions: Vec<(&str, ActionKind)>) -> MigrationPlan {
        MigrationPlan {
            created_at: Utc::now(),
            source_env: String::from("dev"),
            target_env: String::from("production"),
            actions: actions
                .into_iter()
                .map(|(name, kind)| MigrationAction {
                    kind,
                    name: name.to_string(),
                    reason: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_begin_mark_complete_round_trip() {
        let temp = TempDir::new().expect("temp dir");
        let plan = plan(vec![
            ("ntp", ActionKind::AddModule),
            ("common::a", ActionKind::AddKey),
        ]);

        let mut journal = MigrationJournal::begin(temp.path(), &plan).expect("begin");
        journal.mark_applied(0).expect("mark");
        journal.complete().expect("complete");

        let record = MigrationJournal::latest(temp.path())
            .expect("latest")
            .expect("record");
        assert!(record.is_complete());
        assert_eq!(record.applied_count(), 1);
        assert_eq!(record.source_env, "dev");
        assert_eq!(record.actions.len(), 2);
        assert!(record.actions[0].applied);
        assert!(!record.actions[1].applied);
    }

    #[test]
    fn test_incomplete_journal_survives_for_recovery() {
        let temp = TempDir::new().expect("temp dir");
        let plan = plan(vec![("ntp", ActionKind::UpdateModule)]);

        let journal = MigrationJournal::begin(temp.path(), &plan).expect("begin");
        drop(journal);

        let record = MigrationJournal::latest(temp.path())
            .expect("latest")
            .expect("record");
        assert!(!record.is_complete());
        assert_eq!(record.applied_count(), 0);
    }

    #[test]
    fn test_latest_with_no_journal_dir() {
        let temp = TempDir::new().expect("temp dir");
        assert!(MigrationJournal::latest(temp.path())
            .expect("latest")
            .is_none());
    }
}
