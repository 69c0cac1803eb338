//! Environment comparison.
//!
//! [`EnvComparison`] is the structured diff between two loaded environments:
//! three disjoint sets per dimension (modules, data keys). It is a pure
//! read over both snapshots, constructed fresh per invocation and never
//! mutated afterwards. All sets are held sorted so two runs over unchanged
//! trees render byte-identical reports.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::env::{mapping_prefixes, subtree, DataValue, Environment, KEY_SEPARATOR};

/// A module present in both environments with different identities.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDrift {
    /// Identity on the source side (revision or tree digest).
    pub source: String,
    /// Identity on the target side.
    pub target: String,
    /// Kind name on the source side.
    pub source_kind: &'static str,
    /// Kind name on the target side.
    pub target_kind: &'static str,
}

impl ModuleDrift {
    /// True when one side is a nested repository and the other is not.
    #[must_use]
    pub fn is_kind_conflict(&self) -> bool {
        self.source_kind != self.target_kind
    }
}

/// A data key present in both environments with different values, or a
/// scalar-versus-mapping collision at the same path.
#[derive(Debug, Clone, Serialize)]
pub struct DataDrift {
    /// Value on the source side.
    pub source: DataValue,
    /// Value on the target side.
    pub target: DataValue,
    /// True when the two sides disagree on scalar versus mapping.
    pub kind_conflict: bool,
}

/// The structured diff between two environments.
#[derive(Debug, Clone, Serialize)]
pub struct EnvComparison {
    /// Name of the source environment.
    pub source_env: String,
    /// Name of the target environment.
    pub target_env: String,
    /// Modules present only in the source, name to identity.
    pub modules_only_in_source: BTreeMap<String, String>,
    /// Modules present only in the target, name to identity.
    pub modules_only_in_target: BTreeMap<String, String>,
    /// Modules present in both with differing identities.
    pub modules_differing: BTreeMap<String, ModuleDrift>,
    /// Data keys present only in the source.
    pub keys_only_in_source: BTreeMap<String, DataValue>,
    /// Data keys present only in the target.
    pub keys_only_in_target: BTreeMap<String, DataValue>,
    /// Data keys present in both with differing values.
    pub keys_differing: BTreeMap<String, DataDrift>,
}

impl EnvComparison {
    /// Compares two environments. Pure read, no side effects.
    #[must_use]
    pub fn compute(source: &Environment, target: &Environment) -> Self {
        let mut cmp = Self {
            source_env: source.name.clone(),
            target_env: target.name.clone(),
            modules_only_in_source: BTreeMap::new(),
            modules_only_in_target: BTreeMap::new(),
            modules_differing: BTreeMap::new(),
            keys_only_in_source: BTreeMap::new(),
            keys_only_in_target: BTreeMap::new(),
            keys_differing: BTreeMap::new(),
        };

        cmp.compare_modules(source, target);
        cmp.compare_data(source, target);

        debug!(
            "Compared '{}' against '{}': {} pending change(s)",
            cmp.source_env,
            cmp.target_env,
            cmp.pending_changes()
        );
        cmp
    }

    /// Set difference over module names; equal names compare by identity.
    fn compare_modules(&mut self, source: &Environment, target: &Environment) {
        for (name, module) in &source.modules {
            match target.modules.get(name) {
                None => {
                    self.modules_only_in_source
                        .insert(name.clone(), module.identity().to_string());
                }
                Some(other) if other.kind == module.kind => {}
                Some(other) => {
                    self.modules_differing.insert(
                        name.clone(),
                        ModuleDrift {
                            source: module.identity().to_string(),
                            target: other.identity().to_string(),
                            source_kind: module.kind.name(),
                            target_kind: other.kind.name(),
                        },
                    );
                }
            }
        }

        for (name, module) in &target.modules {
            if !source.modules.contains_key(name) {
                self.modules_only_in_target
                    .insert(name.clone(), module.identity().to_string());
            }
        }
    }

    /// Union of leaf key paths; kind conflicts (a leaf on one side under a
    /// mapping prefix on the other) become differing entries pairing the
    /// scalar with the whole colliding subtree.
    fn compare_data(&mut self, source: &Environment, target: &Environment) {
        let source_prefixes = mapping_prefixes(&source.data);
        let target_prefixes = mapping_prefixes(&target.data);

        let mut conflicts: BTreeSet<String> = source
            .data
            .keys()
            .filter(|k| target_prefixes.contains(*k))
            .chain(target.data.keys().filter(|k| source_prefixes.contains(*k)))
            .cloned()
            .collect();
        retain_minimal_conflicts(&mut conflicts);

        for (key, value) in &source.data {
            if covering_conflict(&conflicts, key).is_some() {
                continue;
            }
            match target.data.get(key) {
                None => {
                    self.keys_only_in_source.insert(key.clone(), value.clone());
                }
                Some(other) if other == value => {}
                Some(other) => {
                    self.keys_differing.insert(
                        key.clone(),
                        DataDrift {
                            source: value.clone(),
                            target: other.clone(),
                            kind_conflict: false,
                        },
                    );
                }
            }
        }

        for (key, value) in &target.data {
            if covering_conflict(&conflicts, key).is_none() && !source.data.contains_key(key) {
                self.keys_only_in_target.insert(key.clone(), value.clone());
            }
        }

        for conflict in conflicts {
            let source_value = source
                .data
                .get(&conflict)
                .cloned()
                .unwrap_or_else(|| subtree(&source.data, &conflict));
            let target_value = target
                .data
                .get(&conflict)
                .cloned()
                .unwrap_or_else(|| subtree(&target.data, &conflict));
            self.keys_differing.insert(
                conflict,
                DataDrift {
                    source: source_value,
                    target: target_value,
                    kind_conflict: true,
                },
            );
        }
    }

    /// True when the two environments are structurally identical.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.modules_only_in_source.is_empty()
            && self.modules_only_in_target.is_empty()
            && self.modules_differing.is_empty()
            && self.keys_only_in_source.is_empty()
            && self.keys_only_in_target.is_empty()
            && self.keys_differing.is_empty()
    }

    /// Number of entries a migration would act on (`only_in_target` is
    /// preserved by policy and therefore not counted).
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.modules_only_in_source.len()
            + self.modules_differing.len()
            + self.keys_only_in_source.len()
            + self.keys_differing.len()
    }
}

/// Drops conflict paths nested under another conflict path.
fn retain_minimal_conflicts(conflicts: &mut BTreeSet<String>) {
    let all: Vec<String> = conflicts.iter().cloned().collect();
    conflicts.retain(|candidate| {
        !all.iter().any(|other| {
            other != candidate && candidate.starts_with(&format!("{other}{KEY_SEPARATOR}"))
        })
    });
}

/// Returns the conflict path covering `key`, if any.
fn covering_conflict<'a>(conflicts: &'a BTreeSet<String>, key: &str) -> Option<&'a String> {
    conflicts
        .iter()
        .find(|c| key == c.as_str() || key.starts_with(&format!("{c}{KEY_SEPARATOR}")))
}

impl std::fmt::Display for EnvComparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Source environment: {}", self.source_env)?;
        writeln!(f, "Target environment: {}", self.target_env)?;
        writeln!(
            f,
            "Modules: {} only in source, {} only in target, {} differing",
            self.modules_only_in_source.len(),
            self.modules_only_in_target.len(),
            self.modules_differing.len()
        )?;
        writeln!(
            f,
            "Data keys: {} only in source, {} only in target, {} differing",
            self.keys_only_in_source.len(),
            self.keys_only_in_target.len(),
            self.keys_differing.len()
        )
    }
}
