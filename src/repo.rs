//! Repository facade.
//!
//! [`PuppetConfigRepo`] owns the repo-wide configuration (puppet root and
//! hiera root), discovers the environments underneath, and composes the
//! loader, comparator, and migration engine behind two operations:
//! `migrate` and `report`. Environments live at
//! `<puppet_root>/environments/<name>/modules` with hiera data at
//! `<hiera_root>/environments/<name>`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::compare::EnvComparison;
use crate::env::{Environment, EnvironmentLoader, ModuleKind};
use crate::error::{LoadError, MigrateError, PathError, Result};
use crate::migrate::{MigrationJournal, MigrationPlan, MigrationReport, PlanExecutor};

/// Subdirectory of both roots holding per-environment trees.
const ENVIRONMENTS_DIR: &str = "environments";

/// Subdirectory of one environment holding its modules.
const MODULES_DIR: &str = "modules";

/// Repo-wide configuration, built once at startup and passed into the
/// facade. No hidden process-wide state.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Root of the puppet configuration repository.
    pub puppet_root: PathBuf,
    /// Root of the hiera data tree.
    pub hiera_root: PathBuf,
}

impl RepoConfig {
    /// Builds the configuration, resolving a relative hiera directory
    /// against the puppet root.
    #[must_use]
    pub fn resolve(puppet_root: impl Into<PathBuf>, hiera_dir: impl AsRef<Path>) -> Self {
        let puppet_root = puppet_root.into();
        let hiera_dir = hiera_dir.as_ref();
        let hiera_root = if hiera_dir.is_absolute() {
            hiera_dir.to_path_buf()
        } else {
            puppet_root.join(hiera_dir)
        };
        Self {
            puppet_root,
            hiera_root,
        }
    }

    /// Validates that both roots exist and are directories.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] naming the offending path.
    pub fn validate(&self) -> std::result::Result<(), PathError> {
        for path in [&self.puppet_root, &self.hiera_root] {
            if !path.exists() {
                return Err(PathError::NotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(PathError::NotADirectory { path: path.clone() });
            }
        }
        Ok(())
    }
}

/// Summary of one environment for reporting.
#[derive(Debug, Serialize)]
pub struct EnvSummary {
    /// Environment name.
    pub name: String,
    /// Number of modules.
    pub module_count: usize,
    /// Number of hiera leaf keys.
    pub key_count: usize,
    /// Modules with their identity kind and value.
    pub modules: Vec<ModuleSummary>,
}

/// One module line in a report.
#[derive(Debug, Serialize)]
pub struct ModuleSummary {
    /// Module name.
    pub name: String,
    /// Kind name (`tracked` or `plain`).
    pub kind: &'static str,
    /// Revision or tree digest.
    pub identity: String,
}

/// Drift counts for one ordered environment pair.
#[derive(Debug, Serialize)]
pub struct PairDrift {
    /// Source environment of the pair.
    pub source: String,
    /// Target environment of the pair.
    pub target: String,
    /// Modules only in the source.
    pub modules_only_in_source: usize,
    /// Modules only in the target.
    pub modules_only_in_target: usize,
    /// Modules differing.
    pub modules_differing: usize,
    /// Keys only in the source.
    pub keys_only_in_source: usize,
    /// Keys only in the target.
    pub keys_only_in_target: usize,
    /// Keys differing.
    pub keys_differing: usize,
}

impl PairDrift {
    /// True when the pair is structurally identical.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.modules_only_in_source == 0
            && self.modules_only_in_target == 0
            && self.modules_differing == 0
            && self.keys_only_in_source == 0
            && self.keys_only_in_target == 0
            && self.keys_differing == 0
    }
}

/// Deterministic repository-wide report: every environment plus drift
/// counts for every sorted pair. No timestamps, so stable trees render
/// byte-identical text.
#[derive(Debug, Serialize)]
pub struct RepoReport {
    /// Per-environment summaries, sorted by name.
    pub environments: Vec<EnvSummary>,
    /// Drift per ordered environment pair, sorted.
    pub drift: Vec<PairDrift>,
}

/// Facade over one puppet configuration repository.
#[derive(Debug)]
pub struct PuppetConfigRepo {
    /// Repo-wide configuration.
    config: RepoConfig,
    /// Environment loader, shared across operations.
    loader: EnvironmentLoader,
}

impl PuppetConfigRepo {
    /// Creates the facade after validating the configured roots.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] when either root (or the puppet root's
    /// `environments` directory) is missing or not a directory.
    pub fn new(config: RepoConfig) -> Result<Self> {
        config.validate()?;

        let env_base = config.puppet_root.join(ENVIRONMENTS_DIR);
        if !env_base.is_dir() {
            return Err(PathError::NotFound { path: env_base }.into());
        }

        Ok(Self {
            config,
            loader: EnvironmentLoader::new(),
        })
    }

    /// Replaces the environment loader (test seam).
    #[must_use]
    pub fn with_loader(mut self, loader: EnvironmentLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Returns the repository configuration.
    #[must_use]
    pub const fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Lists the environment names under the repository root, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error when the environments directory cannot be read.
    pub fn env_names(&self) -> Result<Vec<String>> {
        let env_base = self.config.puppet_root.join(ENVIRONMENTS_DIR);
        let mut names = Vec::new();

        for entry in std::fs::read_dir(&env_base)? {
            let entry = entry?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Loads one named environment.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when the environment is missing or its
    /// trees cannot be read.
    pub fn load_environment(&self, name: &str) -> std::result::Result<Environment, LoadError> {
        let env_dir = self
            .config
            .puppet_root
            .join(ENVIRONMENTS_DIR)
            .join(name);
        if !env_dir.is_dir() {
            return Err(LoadError::EnvironmentNotFound {
                name: name.to_string(),
            });
        }

        let module_root = env_dir.join(MODULES_DIR);
        let hiera_root = self
            .config
            .hiera_root
            .join(ENVIRONMENTS_DIR)
            .join(name);
        self.loader.load(name, &module_root, &hiera_root)
    }

    /// Migrates configuration state from one environment into another.
    ///
    /// Loads both environments, compares them, journals the plan, and
    /// executes it against the target tree. Self-migration is permitted
    /// and reports zero actions.
    ///
    /// # Errors
    ///
    /// Returns a [`MigrateError`] when an environment is unknown or fails
    /// to load, or when an action fails partway (with the applied count).
    pub fn migrate(&self, from_env: &str, to_env: &str) -> Result<MigrationReport> {
        info!("Migrating '{from_env}' -> '{to_env}'");

        let known = self.env_names()?;
        for name in [from_env, to_env] {
            if !known.iter().any(|k| k == name) {
                return Err(MigrateError::UnknownEnvironment {
                    name: name.to_string(),
                }
                .into());
            }
        }

        let source = self.load_environment(from_env).map_err(|e| {
            MigrateError::Load {
                environment: from_env.to_string(),
                source: e,
            }
        })?;
        let target = self.load_environment(to_env).map_err(|e| MigrateError::Load {
            environment: to_env.to_string(),
            source: e,
        })?;

        let comparison = EnvComparison::compute(&source, &target);
        let plan = MigrationPlan::from_comparison(&comparison);

        if plan.is_empty() {
            debug!("Nothing to migrate between '{from_env}' and '{to_env}'");
            let executor = PlanExecutor::new(self.loader.revisions());
            return Ok(executor.execute(&plan, comparison, &source, &target, None)?);
        }

        let mut journal = MigrationJournal::begin(&self.config.puppet_root, &plan)?;
        let executor = PlanExecutor::new(self.loader.revisions());
        let report =
            executor.execute(&plan, comparison, &source, &target, Some(&mut journal))?;
        journal.complete()?;

        info!("{report}");
        Ok(report)
    }

    /// Builds the repository-wide report.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if any environment fails to load; a corrupt
    /// environment never produces partial report output.
    pub fn report(&self) -> Result<RepoReport> {
        let names = self.env_names()?;
        let mut environments = Vec::with_capacity(names.len());
        let mut loaded = Vec::with_capacity(names.len());

        for name in &names {
            let env = self.load_environment(name)?;
            environments.push(summarize(&env));
            loaded.push(env);
        }

        let mut drift = Vec::new();
        for (i, source) in loaded.iter().enumerate() {
            for target in &loaded[i + 1..] {
                let cmp = EnvComparison::compute(source, target);
                drift.push(PairDrift {
                    source: cmp.source_env,
                    target: cmp.target_env,
                    modules_only_in_source: cmp.modules_only_in_source.len(),
                    modules_only_in_target: cmp.modules_only_in_target.len(),
                    modules_differing: cmp.modules_differing.len(),
                    keys_only_in_source: cmp.keys_only_in_source.len(),
                    keys_only_in_target: cmp.keys_only_in_target.len(),
                    keys_differing: cmp.keys_differing.len(),
                });
            }
        }

        Ok(RepoReport {
            environments,
            drift,
        })
    }

    /// Loads the most recent migration journal record, if any.
    ///
    /// # Errors
    ///
    /// Returns a journal error when records exist but cannot be read.
    pub fn latest_journal(&self) -> Result<Option<crate::migrate::JournalRecord>> {
        Ok(MigrationJournal::latest(&self.config.puppet_root)?)
    }
}

/// Builds the report summary for one loaded environment.
fn summarize(env: &Environment) -> EnvSummary {
    EnvSummary {
        name: env.name.clone(),
        module_count: env.module_count(),
        key_count: env.key_count(),
        modules: env
            .modules
            .values()
            .map(|m| ModuleSummary {
                name: m.name.clone(),
                kind: m.kind.name(),
                identity: match &m.kind {
                    ModuleKind::Tracked { revision } => revision.clone(),
                    ModuleKind::Plain { tree_hash } => tree_hash.clone(),
                },
            })
            .collect(),
    }
}
