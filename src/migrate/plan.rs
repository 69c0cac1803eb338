//! Migration plan types and construction.
//!
//! A [`MigrationPlan`] is the ordered list of additive-or-update actions
//! that converge a target environment toward a source environment. Entries
//! only in the target are never planned against: migrating dev into
//! production must never remove something already deployed to production
//! that was cleaned up in dev.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compare::EnvComparison;

/// Types of actions in a migration plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Copy a module into the target environment.
    AddModule,
    /// Update a target module to the source's identity.
    UpdateModule,
    /// Add a data key to the target environment.
    AddKey,
    /// Overwrite a target data key with the source's value.
    UpdateKey,
}

/// A single planned action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationAction {
    /// Action type.
    pub kind: ActionKind,
    /// Module name or data key the action applies to.
    pub name: String,
    /// Reason for this action.
    pub reason: String,
}

impl MigrationAction {
    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.kind {
            ActionKind::AddModule => format!("Add module '{}'", self.name),
            ActionKind::UpdateModule => format!("Update module '{}'", self.name),
            ActionKind::AddKey => format!("Add data key '{}'", self.name),
            ActionKind::UpdateKey => format!("Update data key '{}'", self.name),
        }
    }
}

/// An ordered migration plan derived from a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Source environment name.
    pub source_env: String,
    /// Target environment name.
    pub target_env: String,
    /// Planned actions in execution order: module additions, module
    /// updates, key additions, key updates, each sorted by name.
    pub actions: Vec<MigrationAction>,
}

impl MigrationPlan {
    /// Builds a plan from a comparison.
    ///
    /// Every module or key only in the source becomes an add; every
    /// differing entry becomes an update. The ordering is deterministic,
    /// driven by the comparison's sorted sets.
    #[must_use]
    pub fn from_comparison(cmp: &EnvComparison) -> Self {
        let mut actions = Vec::with_capacity(cmp.pending_changes());

        for name in cmp.modules_only_in_source.keys() {
            actions.push(MigrationAction {
                kind: ActionKind::AddModule,
                name: name.clone(),
                reason: String::from("module missing from target"),
            });
        }

        for (name, drift) in &cmp.modules_differing {
            let reason = if drift.is_kind_conflict() {
                format!(
                    "module is {} in source but {} in target",
                    drift.source_kind, drift.target_kind
                )
            } else {
                format!("identity {} differs from {}", drift.source, drift.target)
            };
            actions.push(MigrationAction {
                kind: ActionKind::UpdateModule,
                name: name.clone(),
                reason,
            });
        }

        for name in cmp.keys_only_in_source.keys() {
            actions.push(MigrationAction {
                kind: ActionKind::AddKey,
                name: name.clone(),
                reason: String::from("key missing from target"),
            });
        }

        for (name, drift) in &cmp.keys_differing {
            let reason = if drift.kind_conflict {
                String::from("scalar and mapping collide at this path")
            } else {
                String::from("value differs from source")
            };
            actions.push(MigrationAction {
                kind: ActionKind::UpdateKey,
                name: name.clone(),
                reason,
            });
        }

        Self {
            created_at: Utc::now(),
            source_env: cmp.source_env.clone(),
            target_env: cmp.target_env.clone(),
            actions,
        }
    }

    /// Returns true if the plan has no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of planned actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Counts planned actions of one kind.
    #[must_use]
    pub fn count_of(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind == kind).count()
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AddModule => "add module",
            Self::UpdateModule => "update module",
            Self::AddKey => "add key",
            Self::UpdateKey => "update key",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(
                f,
                "No changes required between '{}' and '{}'",
                self.source_env, self.target_env
            );
        }

        writeln!(
            f,
            "Migration plan {} -> {} ({} action(s)):",
            self.source_env,
            self.target_env,
            self.actions.len()
        )?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {}. {} ({})", i + 1, action.description(), action.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{DataValue, Environment, ModuleKind, PuppetModule};
    use std::path::PathBuf;

    fn env(name: &str, modules: Vec<(&str, ModuleKind)>, data: Vec<(&str, &str)>) -> Environment {
        Environment {
            name: name.to_string(),
            module_root: PathBuf::from("/modules"),
            hiera_root: PathBuf::from("/hiera"),
            modules: modules
                .into_iter()
                .map(|(n, kind)| {
                    (
                        n.to_string(),
                        PuppetModule {
                            name: n.to_string(),
                            root: PathBuf::from(format!("/modules/{n}")),
                            kind,
                        },
                    )
                })
                .collect(),
            data: data
                .into_iter()
                .map(|(k, v)| (k.to_string(), DataValue::String(v.to_string())))
                .collect(),
        }
    }

    #[test]
    fn test_plan_orders_modules_before_keys() {
        let a = env(
            "dev",
            vec![
                (
                    "zz-new",
                    ModuleKind::Plain {
                        tree_hash: String::from("h1"),
                    },
                ),
                (
                    "aa-drifted",
                    ModuleKind::Tracked {
                        revision: String::from("r2"),
                    },
                ),
            ],
            vec![("common::new", "x"), ("common::drifted", "dev")],
        );
        let b = env(
            "production",
            vec![(
                "aa-drifted",
                ModuleKind::Tracked {
                    revision: String::from("r1"),
                },
            )],
            vec![("common::drifted", "prod")],
        );

        let cmp = crate::compare::EnvComparison::compute(&a, &b);
        let plan = MigrationPlan::from_comparison(&cmp);

        let kinds: Vec<ActionKind> = plan.actions.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::AddModule,
                ActionKind::UpdateModule,
                ActionKind::AddKey,
                ActionKind::UpdateKey,
            ]
        );
        assert_eq!(plan.actions[0].name, "zz-new");
        assert_eq!(plan.actions[1].name, "aa-drifted");
    }

    #[test]
    fn test_target_only_entries_are_never_planned() {
        let a = env("dev", vec![], vec![]);
        let b = env(
            "production",
            vec![(
                "deployed-only-here",
                ModuleKind::Plain {
                    tree_hash: String::from("h9"),
                },
            )],
            vec![("common::prod_only", "keep")],
        );

        let cmp = crate::compare::EnvComparison::compute(&a, &b);
        let plan = MigrationPlan::from_comparison(&cmp);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_identical_environments_give_empty_plan() {
        let a = env(
            "dev",
            vec![(
                "ntp",
                ModuleKind::Tracked {
                    revision: String::from("r1"),
                },
            )],
            vec![("common::a", "1")],
        );

        let cmp = crate::compare::EnvComparison::compute(&a, &a);
        let plan = MigrationPlan::from_comparison(&cmp);
        assert!(plan.is_empty());
        assert_eq!(plan.action_count(), 0);
    }
}
