//! In-memory structural model of one Puppet environment.
//!
//! An [`Environment`] is the loaded shape of one on-disk environment tree:
//! the modules under its module directory and the flattened hiera leaf keys
//! under its data directory. It is a read-only snapshot; migration writes go
//! to the filesystem, never back into the model.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use super::hiera::DataValue;

/// How a module's identity is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleKind {
    /// A nested repository pinned at a revision reference.
    Tracked {
        /// Current revision reference.
        revision: String,
    },
    /// A plain directory identified by a digest of its file tree.
    Plain {
        /// Hex-encoded SHA-256 digest of the module tree.
        tree_hash: String,
    },
}

impl ModuleKind {
    /// Returns a short name for the kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tracked { .. } => "tracked",
            Self::Plain { .. } => "plain",
        }
    }
}

/// A named module within an environment.
#[derive(Debug, Clone, Serialize)]
pub struct PuppetModule {
    /// Module name (directory basename, unique within the environment).
    pub name: String,
    /// Absolute path to the module root.
    pub root: PathBuf,
    /// Identity kind: tracked revision or tree digest.
    pub kind: ModuleKind,
}

impl PuppetModule {
    /// Returns the identity string used for equality between environments.
    #[must_use]
    pub fn identity(&self) -> &str {
        match &self.kind {
            ModuleKind::Tracked { revision } => revision,
            ModuleKind::Plain { tree_hash } => tree_hash,
        }
    }

    /// Returns true when the module is a nested repository.
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        matches!(self.kind, ModuleKind::Tracked { .. })
    }
}

/// A loaded environment: modules plus flattened hiera data.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Environment name (e.g. `dev`, `production`).
    pub name: String,
    /// Directory containing the environment's modules.
    pub module_root: PathBuf,
    /// Directory containing the environment's hiera data.
    pub hiera_root: PathBuf,
    /// Modules keyed by name, sorted.
    pub modules: BTreeMap<String, PuppetModule>,
    /// Hiera leaf keys and their values, sorted.
    pub data: BTreeMap<String, DataValue>,
}

impl Environment {
    /// Number of modules in the environment.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of hiera leaf keys in the environment.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Display for PuppetModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}: {})", self.name, self.kind.name(), self.identity())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Environment: {} ({} module(s), {} key(s))",
            self.name,
            self.module_count(),
            self.key_count()
        )?;
        for module in self.modules.values() {
            writeln!(f, "  {module}")?;
        }
        Ok(())
    }
}
