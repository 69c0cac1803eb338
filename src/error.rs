//! Error types for the puppetsync migration tool.
//!
//! This module provides the error hierarchy for all operations in the
//! migration lifecycle: path validation, environment loading, and migration
//! execution. Comparison itself is infallible; structurally incomparable
//! entries (scalar versus mapping, plain versus tracked) are recorded as
//! differing and surface as action failures at execution time.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for puppetsync operations.
#[derive(Debug, Error)]
pub enum PuppetSyncError {
    /// Repository path validation errors.
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Environment loading errors.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Migration errors.
    #[error("Migration error: {0}")]
    Migrate(#[from] MigrateError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository path validation errors.
///
/// These are fatal and reported before any core logic runs.
#[derive(Debug, Error)]
pub enum PathError {
    /// A configured directory does not exist.
    #[error("Directory not found: {path}")]
    NotFound {
        /// Path that does not exist.
        path: PathBuf,
    },

    /// A configured path exists but is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory {
        /// Path that is not a directory.
        path: PathBuf,
    },
}

/// Environment loading errors.
///
/// A failed load aborts the whole operation that needed the environment;
/// partial or corrupt trees never participate in comparison or migration.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The named environment does not exist under the repository root.
    #[error("Environment does not exist: {name}")]
    EnvironmentNotFound {
        /// Name of the missing environment.
        name: String,
    },

    /// The environment has no modules directory.
    #[error("No modules directory in environment '{environment}': {path}")]
    MissingModulesDir {
        /// Environment being loaded.
        environment: String,
        /// Expected modules directory.
        path: PathBuf,
    },

    /// The environment has no hiera data directory.
    #[error("No hiera data directory for environment '{environment}': {path}")]
    MissingHieraDir {
        /// Environment being loaded.
        environment: String,
        /// Expected hiera directory.
        path: PathBuf,
    },

    /// A hiera data file could not be parsed.
    #[error("Malformed hiera data file {path}: {message}")]
    DataParse {
        /// File that failed to parse.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// A module's revision reference could not be read.
    #[error("Failed to read revision of module '{module}': {message}")]
    RevisionRead {
        /// Module whose revision could not be read.
        module: String,
        /// Description of the failure.
        message: String,
    },

    /// An IO error occurred while reading a tree.
    #[error("Failed to read {path}: {message}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Description of the IO failure.
        message: String,
    },
}

/// Migration errors.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A named environment does not exist in the repository.
    #[error("Environment does not exist: {name}")]
    UnknownEnvironment {
        /// Name of the missing environment.
        name: String,
    },

    /// One of the two environments failed to load.
    #[error("Failed to load environment '{environment}': {source}")]
    Load {
        /// Environment that failed to load.
        environment: String,
        /// Underlying load failure.
        #[source]
        source: LoadError,
    },

    /// An action in the plan failed to apply.
    ///
    /// Actions already applied are not rolled back; the count is carried so
    /// operators can inspect the partial state manually.
    #[error("Migration action failed after {applied} applied action(s): {action}: {reason}")]
    ActionFailed {
        /// Number of actions applied before the failure.
        applied: usize,
        /// Description of the failing action.
        action: String,
        /// Reason the action failed.
        reason: String,
    },

    /// The migration journal could not be written or read.
    #[error("Migration journal error: {message}")]
    Journal {
        /// Description of the journal failure.
        message: String,
    },
}

/// Result type alias for puppetsync operations.
pub type Result<T> = std::result::Result<T, PuppetSyncError>;

impl PuppetSyncError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl LoadError {
    /// Creates an IO load error for the given path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

impl MigrateError {
    /// Creates an action failure carrying the applied-action count.
    #[must_use]
    pub fn action_failed(
        applied: usize,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ActionFailed {
            applied,
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Creates a journal error with the given message.
    #[must_use]
    pub fn journal(message: impl Into<String>) -> Self {
        Self::Journal {
            message: message.into(),
        }
    }
}
