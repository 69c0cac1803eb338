// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::redundant_clone)]     // Useless clones warning

// ============================================================================
// Crate Documentation
// ============================================================================

//! # puppetsync
//!
//! Compares and migrates configuration state between named environments of a
//! Puppet-style configuration repository.
//!
//! ## Overview
//!
//! An environment (`dev`, `production`, ...) is a directory tree of modules
//! plus a hiera data directory. puppetsync:
//!
//! - Loads each environment into a structural model (modules with revision
//!   or tree-digest identity, flattened hiera leaf keys)
//! - Computes a deterministic diff between two environments
//! - Applies a one-directional migration converging the target on the
//!   source's module set and data, without ever deleting target-only state
//!
//! ## Architecture
//!
//! 1. **Environment Model**: on-disk trees loaded into [`env::Environment`]
//! 2. **Comparator**: [`compare::EnvComparison`] over two models
//! 3. **Migration Engine**: [`migrate::MigrationPlan`] executed against the
//!    target tree, journaled for operator recovery
//! 4. **Facade**: [`repo::PuppetConfigRepo`] composing the above
//!
//! ## Modules
//!
//! - [`env`]: environment loading and structural model
//! - [`compare`]: structured diffs between environments
//! - [`migrate`]: plan construction, journaling, and execution
//! - [`repo`]: repository facade and report
//! - [`cli`]: command-line interface
//! - [`error`]: error hierarchy

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod compare;
pub mod env;
pub mod error;
pub mod migrate;
pub mod repo;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormat, OutputFormatter};
pub use compare::{DataDrift, EnvComparison, ModuleDrift};
pub use env::{DataValue, Environment, EnvironmentLoader, ModuleKind, PuppetModule, RevisionStore};
pub use error::{PuppetSyncError, Result};
pub use migrate::{ActionKind, MigrationJournal, MigrationPlan, MigrationReport, PlanExecutor};
pub use repo::{PuppetConfigRepo, RepoConfig, RepoReport};
