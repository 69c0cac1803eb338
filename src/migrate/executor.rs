//! Plan execution against the target environment tree.
//!
//! Actions are applied one at a time, in plan order, directly to the target
//! environment's on-disk tree. The first failing action aborts execution
//! with the count of actions already applied; nothing is rolled back, since
//! applied actions (a deployed module revision, an overwritten data file)
//! are not always cleanly reversible. The journal records enough for an
//! operator to finish or undo the run by hand.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::compare::EnvComparison;
use crate::env::{load_file, split_key, subtree, write_file, DataValue, Environment, ModuleKind, RevisionStore};
use crate::error::MigrateError;

use super::journal::MigrationJournal;
use super::plan::{ActionKind, MigrationAction, MigrationPlan};

/// Executor for migration plans.
pub struct PlanExecutor<'a> {
    /// Revision state access for tracked modules.
    revisions: &'a dyn RevisionStore,
}

/// Summary of a completed migration.
#[derive(Debug, Serialize)]
pub struct MigrationReport {
    /// Source environment name.
    pub source_env: String,
    /// Target environment name.
    pub target_env: String,
    /// Modules copied into the target.
    pub modules_added: usize,
    /// Modules updated to the source identity.
    pub modules_updated: usize,
    /// Data keys added to the target.
    pub keys_added: usize,
    /// Data keys overwritten with the source value.
    pub keys_updated: usize,
    /// The comparison the migration was derived from, kept for audit.
    pub comparison: EnvComparison,
}

impl MigrationReport {
    /// Total number of actions applied.
    #[must_use]
    pub const fn total_actions(&self) -> usize {
        self.modules_added + self.modules_updated + self.keys_added + self.keys_updated
    }

    /// True when the migration had nothing to do.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.total_actions() == 0
    }
}

impl std::fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Migrated '{}' -> '{}': {} module(s) added, {} updated; {} key(s) added, {} updated",
            self.source_env,
            self.target_env,
            self.modules_added,
            self.modules_updated,
            self.keys_added,
            self.keys_updated
        )
    }
}

impl<'a> PlanExecutor<'a> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(revisions: &'a dyn RevisionStore) -> Self {
        Self { revisions }
    }

    /// Executes a plan against the target environment's tree.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::ActionFailed`] at the first failing action,
    /// carrying the number of actions already applied.
    pub fn execute(
        &self,
        plan: &MigrationPlan,
        comparison: EnvComparison,
        source: &Environment,
        target: &Environment,
        mut journal: Option<&mut MigrationJournal>,
    ) -> Result<MigrationReport, MigrateError> {
        info!(
            "Executing migration plan '{}' -> '{}' with {} action(s)",
            plan.source_env,
            plan.target_env,
            plan.action_count()
        );

        let mut applied = 0usize;
        for (index, action) in plan.actions.iter().enumerate() {
            info!("Applying action {}: {}", index + 1, action.description());

            if let Err(reason) = self.apply(action, source, target) {
                warn!(
                    "Action failed after {applied} applied action(s): {}: {reason}",
                    action.description()
                );
                return Err(MigrateError::action_failed(
                    applied,
                    action.description(),
                    reason,
                ));
            }

            applied += 1;
            if let Some(journal) = journal.as_deref_mut() {
                journal.mark_applied(index)?;
            }
        }

        Ok(MigrationReport {
            source_env: plan.source_env.clone(),
            target_env: plan.target_env.clone(),
            modules_added: plan.count_of(ActionKind::AddModule),
            modules_updated: plan.count_of(ActionKind::UpdateModule),
            keys_added: plan.count_of(ActionKind::AddKey),
            keys_updated: plan.count_of(ActionKind::UpdateKey),
            comparison,
        })
    }

    /// Applies a single action; failures are reported as reason strings.
    fn apply(
        &self,
        action: &MigrationAction,
        source: &Environment,
        target: &Environment,
    ) -> Result<(), String> {
        match action.kind {
            ActionKind::AddModule => self.add_module(&action.name, source, target),
            ActionKind::UpdateModule => self.update_module(&action.name, source, target),
            ActionKind::AddKey | ActionKind::UpdateKey => {
                write_key(&action.name, source, target)
            }
        }
    }

    /// Copies a source module into the target's module directory.
    fn add_module(
        &self,
        name: &str,
        source: &Environment,
        target: &Environment,
    ) -> Result<(), String> {
        let module = source
            .modules
            .get(name)
            .ok_or_else(|| format!("module '{name}' not present in source environment"))?;
        let dest = target.module_root.join(name);

        copy_dir_all(&module.root, &dest).map_err(|e| format!("copy failed: {e}"))?;

        if let ModuleKind::Tracked { revision } = &module.kind {
            self.revisions
                .pin(&dest, revision)
                .map_err(|e| format!("failed to pin revision: {e}"))?;
        }
        Ok(())
    }

    /// Converges a target module on the source's identity.
    fn update_module(
        &self,
        name: &str,
        source: &Environment,
        target: &Environment,
    ) -> Result<(), String> {
        let src = source
            .modules
            .get(name)
            .ok_or_else(|| format!("module '{name}' not present in source environment"))?;
        let tgt = target
            .modules
            .get(name)
            .ok_or_else(|| format!("module '{name}' not present in target environment"))?;

        match (&src.kind, &tgt.kind) {
            (ModuleKind::Tracked { revision }, ModuleKind::Tracked { .. }) => self
                .revisions
                .pin(&tgt.root, revision)
                .map_err(|e| format!("failed to pin revision: {e}")),
            (ModuleKind::Plain { .. }, ModuleKind::Plain { .. }) => {
                std::fs::remove_dir_all(&tgt.root)
                    .map_err(|e| format!("failed to clear target module: {e}"))?;
                copy_dir_all(&src.root, &tgt.root).map_err(|e| format!("copy failed: {e}"))
            }
            _ => Err(format!(
                "module is {} in source but {} in target; resolve manually",
                src.kind.name(),
                tgt.kind.name()
            )),
        }
    }
}

impl std::fmt::Debug for PlanExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor").finish_non_exhaustive()
    }
}

/// Writes one source data key into the target's hiera tree.
fn write_key(key: &str, source: &Environment, target: &Environment) -> Result<(), String> {
    let value = source
        .data
        .get(key)
        .cloned()
        .unwrap_or_else(|| subtree(&source.data, key));

    let (file, path) = split_key(key);
    let file_path = resolve_data_file(&target.hiera_root, file);

    if path.is_empty() {
        return write_file(&file_path, &value).map_err(|e| format!("write failed: {e}"));
    }

    let mut root = if file_path.is_file() {
        load_file(&file_path).map_err(|e| e.to_string())?
    } else {
        DataValue::Mapping(std::collections::BTreeMap::new())
    };
    root.set_path(&path, value);
    write_file(&file_path, &root).map_err(|e| format!("write failed: {e}"))
}

/// Resolves the on-disk file for a data-file key component.
///
/// An existing `.yml` file is reused; otherwise `.yaml` is used (and created
/// on write if absent).
fn resolve_data_file(hiera_root: &Path, file: &str) -> PathBuf {
    let yml = hiera_root.join(format!("{file}.yml"));
    if yml.is_file() {
        yml
    } else {
        hiera_root.join(format!("{file}.yaml"))
    }
}

/// Recursively copies a directory tree.
fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copy_dir_all(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{EnvironmentLoader, GitMetadataStore};
    use crate::migrate::plan::MigrationPlan;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    }

    /// Creates `<root>/<env>/modules` and `<root>/hiera/<env>` directories.
    fn scaffold(root: &Path, env: &str) -> (PathBuf, PathBuf) {
        let modules = root.join(env).join("modules");
        let hiera = root.join("hiera").join(env);
        std::fs::create_dir_all(&modules).expect("mkdir");
        std::fs::create_dir_all(&hiera).expect("mkdir");
        (modules, hiera)
    }

    fn load(name: &str, modules: &Path, hiera: &Path) -> Environment {
        EnvironmentLoader::new()
            .load(name, modules, hiera)
            .expect("load")
    }

    fn run(source: &Environment, target: &Environment) -> Result<MigrationReport, MigrateError> {
        let cmp = EnvComparison::compute(source, target);
        let plan = MigrationPlan::from_comparison(&cmp);
        let store = GitMetadataStore::new();
        PlanExecutor::new(&store).execute(&plan, cmp, source, target, None)
    }

    #[test]
    fn test_migration_converges_target_on_source() {
        let temp = TempDir::new().expect("temp dir");
        let (src_mod, src_hiera) = scaffold(temp.path(), "dev");
        let (tgt_mod, tgt_hiera) = scaffold(temp.path(), "production");

        write(&src_mod, "ntp/manifests/init.pp", "class ntp { $v = 2 }\n");
        write(&src_hiera, "common.yaml", "site::name: prod1\nsite::port: 8080\n");
        write(&tgt_mod, "legacy/manifests/init.pp", "class legacy {}\n");
        write(&tgt_hiera, "common.yaml", "prod_only: keep\n");

        let source = load("dev", &src_mod, &src_hiera);
        let target = load("production", &tgt_mod, &tgt_hiera);

        let report = run(&source, &target).expect("migrate");
        assert_eq!(report.modules_added, 1);
        assert_eq!(report.keys_added, 2);

        // Reloaded target now contains everything the source had, and the
        // target-only module and key survived.
        let after = load("production", &tgt_mod, &tgt_hiera);
        let cmp = EnvComparison::compute(&source, &after);
        assert!(cmp.modules_only_in_source.is_empty());
        assert!(cmp.keys_only_in_source.is_empty());
        assert!(cmp.keys_differing.is_empty());
        assert!(after.modules.contains_key("legacy"));
        assert!(after.data.contains_key("common::prod_only"));
    }

    #[test]
    fn test_revision_update_counts_one_module_update() {
        let temp = TempDir::new().expect("temp dir");
        let (src_mod, src_hiera) = scaffold(temp.path(), "dev");
        let (tgt_mod, tgt_hiera) = scaffold(temp.path(), "production");

        write(&src_mod, "foo/.git/HEAD", "r2\n");
        write(&src_mod, "foo/manifests/init.pp", "class foo {}\n");
        write(&tgt_mod, "foo/.git/HEAD", "r1\n");
        write(&tgt_mod, "foo/manifests/init.pp", "class foo {}\n");

        let source = load("dev", &src_mod, &src_hiera);
        let target = load("production", &tgt_mod, &tgt_hiera);

        let report = run(&source, &target).expect("migrate");
        assert_eq!(report.modules_updated, 1);
        assert_eq!(report.total_actions(), 1);

        let after = load("production", &tgt_mod, &tgt_hiera);
        assert_eq!(after.modules["foo"].identity(), "r2");
    }

    #[test]
    fn test_self_migration_is_a_noop() {
        let temp = TempDir::new().expect("temp dir");
        let (modules, hiera) = scaffold(temp.path(), "dev");
        write(&modules, "ntp/manifests/init.pp", "class ntp {}\n");
        write(&hiera, "common.yaml", "a: 1\n");

        let env = load("dev", &modules, &hiera);
        let before = EnvironmentLoader::new().load("dev", &modules, &hiera).expect("load");

        let report = run(&env, &env).expect("migrate");
        assert!(report.is_noop());

        let after = load("dev", &modules, &hiera);
        assert_eq!(before.modules["ntp"].identity(), after.modules["ntp"].identity());
        assert_eq!(before.data, after.data);
    }

    #[test]
    fn test_failure_on_third_of_five_reports_two_applied() {
        let temp = TempDir::new().expect("temp dir");
        let (src_mod, src_hiera) = scaffold(temp.path(), "dev");
        let (tgt_mod, tgt_hiera) = scaffold(temp.path(), "production");

        // Plan order: module adds by name, module updates by name, then
        // data keys. 'mm-conflict' is tracked in source but plain in the
        // target, so the third action (its update) fails.
        write(&src_mod, "aa-new/manifests/init.pp", "class aa {}\n");
        write(&src_mod, "bb-new/manifests/init.pp", "class bb {}\n");
        write(&src_mod, "mm-conflict/.git/HEAD", "r2\n");
        write(&src_mod, "mm-conflict/manifests/init.pp", "class mm {}\n");
        write(&tgt_mod, "mm-conflict/manifests/init.pp", "class mm {}\n");
        write(&src_hiera, "common.yaml", "fresh: 1\nstale: 2\n");
        write(&tgt_hiera, "common.yaml", "stale: 9\n");

        let source = load("dev", &src_mod, &src_hiera);
        let target = load("production", &tgt_mod, &tgt_hiera);

        let cmp = EnvComparison::compute(&source, &target);
        let plan = MigrationPlan::from_comparison(&cmp);
        assert_eq!(plan.action_count(), 5);

        let err = run(&source, &target).expect_err("must fail");
        let MigrateError::ActionFailed { applied, action, .. } = err else {
            panic!("expected ActionFailed, got {err}");
        };
        assert_eq!(applied, 2);
        assert!(action.contains("mm-conflict"));
    }

    #[test]
    fn test_empty_source_file_preserves_target_keys() {
        let temp = TempDir::new().expect("temp dir");
        let (src_mod, src_hiera) = scaffold(temp.path(), "dev");
        let (tgt_mod, tgt_hiera) = scaffold(temp.path(), "production");

        // An empty dev file must not be treated as a whole-file value that
        // collides with (and wipes) the populated production file.
        write(&src_hiera, "common.yaml", "");
        write(&tgt_hiera, "common.yaml", "prod_only: keep\n");

        let source = load("dev", &src_mod, &src_hiera);
        let target = load("production", &tgt_mod, &tgt_hiera);

        let report = run(&source, &target).expect("migrate");
        assert!(report.is_noop());

        let after = load("production", &tgt_mod, &tgt_hiera);
        assert_eq!(
            after.data.get("common::prod_only"),
            Some(&DataValue::String(String::from("keep")))
        );
    }

    #[test]
    fn test_scalar_overwrites_colliding_mapping() {
        let temp = TempDir::new().expect("temp dir");
        let (src_mod, src_hiera) = scaffold(temp.path(), "dev");
        let (tgt_mod, tgt_hiera) = scaffold(temp.path(), "production");

        write(&src_hiera, "common.yaml", "site: flat\n");
        write(&tgt_hiera, "common.yaml", "site:\n  name: prod1\n");

        let source = load("dev", &src_mod, &src_hiera);
        let target = load("production", &tgt_mod, &tgt_hiera);

        let report = run(&source, &target).expect("migrate");
        assert_eq!(report.keys_updated, 1);

        let after = load("production", &tgt_mod, &tgt_hiera);
        assert_eq!(
            after.data.get("common::site"),
            Some(&DataValue::String(String::from("flat")))
        );
    }
}
