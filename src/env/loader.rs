//! Environment loading.
//!
//! The loader turns one on-disk environment (module directory plus hiera
//! data directory) into an [`Environment`] snapshot. Loading is
//! all-or-nothing: a missing directory, an unreadable module, or a single
//! malformed data file fails the whole load, so partial or corrupt trees
//! never reach the comparator or the migration engine.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::LoadError;

use super::hash::TreeHasher;
use super::hiera;
use super::model::{Environment, ModuleKind, PuppetModule};
use super::revision::{GitMetadataStore, RevisionStore};

/// Loader for environment trees.
pub struct EnvironmentLoader {
    /// Revision state access for nested-repository modules.
    revisions: Box<dyn RevisionStore>,
    /// Tree hasher for plain modules.
    hasher: TreeHasher,
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentLoader {
    /// Creates a loader backed by on-disk git metadata.
    #[must_use]
    pub fn new() -> Self {
        Self {
            revisions: Box::new(GitMetadataStore::new()),
            hasher: TreeHasher::new(),
        }
    }

    /// Replaces the revision store (test seam).
    #[must_use]
    pub fn with_revision_store(mut self, revisions: Box<dyn RevisionStore>) -> Self {
        self.revisions = revisions;
        self
    }

    /// Returns the revision store, shared with the migration executor.
    #[must_use]
    pub fn revisions(&self) -> &dyn RevisionStore {
        self.revisions.as_ref()
    }

    /// Loads one environment from its module and hiera directories.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when either directory is missing or not a
    /// directory, a module cannot be inspected, or a data file is malformed.
    pub fn load(
        &self,
        name: &str,
        module_root: &Path,
        hiera_root: &Path,
    ) -> Result<Environment, LoadError> {
        info!("Loading environment '{name}'");

        if !module_root.is_dir() {
            return Err(LoadError::MissingModulesDir {
                environment: name.to_string(),
                path: module_root.to_path_buf(),
            });
        }
        if !hiera_root.is_dir() {
            return Err(LoadError::MissingHieraDir {
                environment: name.to_string(),
                path: hiera_root.to_path_buf(),
            });
        }

        let modules = self.load_modules(module_root)?;
        let data = hiera::load_tree(hiera_root)?;

        debug!(
            "Environment '{name}': {} module(s), {} hiera key(s)",
            modules.len(),
            data.len()
        );

        Ok(Environment {
            name: name.to_string(),
            module_root: module_root.to_path_buf(),
            hiera_root: hiera_root.to_path_buf(),
            modules,
            data,
        })
    }

    /// Enumerates module directories and records each module's identity.
    fn load_modules(
        &self,
        module_root: &Path,
    ) -> Result<BTreeMap<String, PuppetModule>, LoadError> {
        let mut modules = BTreeMap::new();

        let entries =
            std::fs::read_dir(module_root).map_err(|e| LoadError::io(module_root, &e))?;
        for entry in entries {
            let entry = entry.map_err(|e| LoadError::io(module_root, &e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let kind = match self.revisions.current(&path)? {
                Some(revision) => ModuleKind::Tracked { revision },
                None => ModuleKind::Plain {
                    tree_hash: self.hasher.hash_tree(&path)?,
                },
            };

            modules.insert(
                name.clone(),
                PuppetModule {
                    name,
                    root: path,
                    kind,
                },
            );
        }

        Ok(modules)
    }
}

impl std::fmt::Debug for EnvironmentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentLoader")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::revision::MockRevisionStore;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    }

    fn scaffold(temp: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        let modules = temp.path().join("modules");
        let hiera = temp.path().join("hiera");
        std::fs::create_dir_all(&modules).expect("mkdir");
        std::fs::create_dir_all(&hiera).expect("mkdir");
        (modules, hiera)
    }

    #[test]
    fn test_load_plain_and_tracked_modules() {
        let temp = TempDir::new().expect("temp dir");
        let (modules, hiera) = scaffold(&temp);
        write(&modules, "ntp/manifests/init.pp", "class ntp {}\n");
        write(&modules, "firewall/manifests/init.pp", "class firewall {}\n");
        write(&modules, "firewall/.git/HEAD", "abc123\n");
        write(&hiera, "common.yaml", "site::name: dev1\n");

        let env = EnvironmentLoader::new()
            .load("dev", &modules, &hiera)
            .expect("load");

        assert_eq!(env.module_count(), 2);
        assert!(!env.modules["ntp"].is_tracked());
        assert!(env.modules["firewall"].is_tracked());
        assert_eq!(env.modules["firewall"].identity(), "abc123");
        assert_eq!(env.key_count(), 1);
    }

    #[test]
    fn test_missing_modules_dir_fails() {
        let temp = TempDir::new().expect("temp dir");
        let hiera = temp.path().join("hiera");
        std::fs::create_dir_all(&hiera).expect("mkdir");

        let result =
            EnvironmentLoader::new().load("dev", &temp.path().join("missing"), &hiera);
        assert!(matches!(result, Err(LoadError::MissingModulesDir { .. })));
    }

    #[test]
    fn test_malformed_hiera_file_fails_whole_load() {
        let temp = TempDir::new().expect("temp dir");
        let (modules, hiera) = scaffold(&temp);
        write(&modules, "ntp/manifests/init.pp", "class ntp {}\n");
        write(&hiera, "broken.yaml", ": [not yaml\n");

        let result = EnvironmentLoader::new().load("dev", &modules, &hiera);
        assert!(matches!(result, Err(LoadError::DataParse { .. })));
    }

    #[test]
    fn test_loose_files_in_module_dir_are_ignored() {
        let temp = TempDir::new().expect("temp dir");
        let (modules, hiera) = scaffold(&temp);
        write(&modules, "README.md", "not a module\n");
        write(&modules, "ntp/manifests/init.pp", "class ntp {}\n");

        let env = EnvironmentLoader::new()
            .load("dev", &modules, &hiera)
            .expect("load");
        assert_eq!(env.module_count(), 1);
    }

    #[test]
    fn test_mocked_revision_store_is_consulted() {
        let temp = TempDir::new().expect("temp dir");
        let (modules, hiera) = scaffold(&temp);
        write(&modules, "ntp/manifests/init.pp", "class ntp {}\n");

        let mut store = MockRevisionStore::new();
        store
            .expect_current()
            .returning(|_| Ok(Some(String::from("r42"))));

        let env = EnvironmentLoader::new()
            .with_revision_store(Box::new(store))
            .load("dev", &modules, &hiera)
            .expect("load");
        assert_eq!(env.modules["ntp"].identity(), "r42");
    }
}
