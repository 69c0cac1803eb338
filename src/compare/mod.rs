//! Comparison module: structured diffs between two environments.

mod diff;

pub use diff::{DataDrift, EnvComparison, ModuleDrift};
