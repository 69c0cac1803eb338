//! Migration module: plan construction, journaling, and execution.
//!
//! Migration is one-directional and additive-or-update only: the target
//! converges toward the source's module set and data, and target-only
//! state is never deleted.

mod executor;
mod journal;
mod plan;

pub use executor::{MigrationReport, PlanExecutor};
pub use journal::{JournalAction, JournalRecord, MigrationJournal, JOURNAL_DIR};
pub use plan::{ActionKind, MigrationAction, MigrationPlan};
