//! Hierarchical (hiera) data loading and write-back.
//!
//! Hiera data lives as YAML files under an environment's data directory.
//! Each file is parsed into a [`DataValue`] tree and flattened into leaf
//! key paths of the form `<relative file path without extension>::<in-file
//! key path>`, with `::` separating nested mapping keys. Values are
//! preserved as-is: no coercion between scalars, sequences, and mappings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::LoadError;

/// Separator between nested mapping keys within one data file.
pub const KEY_SEPARATOR: &str = "::";

/// A value in the hiera data tree.
///
/// Mirrors the YAML data model, with mappings held in sorted order so that
/// comparisons and rendered output are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// An explicit null.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// A numeric scalar.
    Number(serde_yaml::Number),
    /// A string scalar.
    String(String),
    /// A sequence, compared as a whole (never flattened).
    Sequence(Vec<DataValue>),
    /// A nested mapping.
    Mapping(BTreeMap<String, DataValue>),
}

impl DataValue {
    /// Sets the value at a nested key path, creating intermediate mappings.
    ///
    /// Existing non-mapping values along the path are overwritten by
    /// mappings; the leaf itself is overwritten unconditionally.
    pub fn set_path(&mut self, path: &[&str], value: Self) {
        let Some((head, rest)) = path.split_first() else {
            *self = value;
            return;
        };

        if !matches!(self, Self::Mapping(_)) {
            *self = Self::Mapping(BTreeMap::new());
        }

        if let Self::Mapping(map) = self {
            let entry = map
                .entry((*head).to_string())
                .or_insert(Self::Mapping(BTreeMap::new()));
            entry.set_path(rest, value);
        }
    }
}

impl From<serde_yaml::Value> for DataValue {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Self::Null,
            serde_yaml::Value::Bool(b) => Self::Bool(b),
            serde_yaml::Value::Number(n) => Self::Number(n),
            serde_yaml::Value::String(s) => Self::String(s),
            serde_yaml::Value::Sequence(seq) => {
                Self::Sequence(seq.into_iter().map(Self::from).collect())
            }
            serde_yaml::Value::Mapping(map) => Self::Mapping(
                map.into_iter()
                    .map(|(k, v)| (yaml_key_to_string(&k), Self::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Self::from(tagged.value),
        }
    }
}

/// Renders a YAML mapping key as a string key path segment.
fn yaml_key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Parses one hiera data file into a [`DataValue`] tree.
///
/// An empty file parses as an empty mapping.
///
/// # Errors
///
/// Returns [`LoadError::DataParse`] when the file is unreadable or not valid
/// YAML; the caller aborts the whole environment load in that case.
pub fn load_file(path: &Path) -> Result<DataValue, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::DataParse {
        path: path.to_path_buf(),
        message: format!("failed to read file: {e}"),
    })?;

    let value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| LoadError::DataParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let data = DataValue::from(value);
    Ok(match data {
        DataValue::Null => DataValue::Mapping(BTreeMap::new()),
        other => other,
    })
}

/// Writes a [`DataValue`] tree back to a hiera data file.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns the underlying IO or serialization error.
pub fn write_file(path: &Path, value: &DataValue) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rendered =
        serde_yaml::to_string(value).map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(path, rendered)
}

/// Loads every hiera data file under `hiera_root` into a flat leaf-key map.
///
/// Keys are `<relative path without extension>` for files whose root is not
/// a mapping, or `<relative path without extension>::a::b` for nested
/// mapping entries. Empty files and empty mappings contribute no keys. The
/// load is all-or-nothing: a single malformed file fails the whole tree.
///
/// # Errors
///
/// Returns a [`LoadError`] when the directory cannot be walked or any file
/// fails to parse.
pub fn load_tree(hiera_root: &Path) -> Result<BTreeMap<String, DataValue>, LoadError> {
    let mut leaves = BTreeMap::new();
    let mut files = Vec::new();
    collect_data_files(hiera_root, hiera_root, &mut files)?;
    files.sort();

    for file in files {
        let value = load_file(&file)?;
        let prefix = file_key_prefix(hiera_root, &file);
        trace!("Loaded hiera file {} as '{}'", file.display(), prefix);
        flatten_into(&prefix, &value, &mut leaves);
    }

    debug!(
        "Loaded {} hiera leaf key(s) from {}",
        leaves.len(),
        hiera_root.display()
    );
    Ok(leaves)
}

/// Recursively collects YAML files under a hiera directory.
fn collect_data_files(
    root: &Path,
    dir: &Path,
    files: &mut Vec<PathBuf>,
) -> Result<(), LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, &e))?;

    for entry in entries {
        let entry = entry.map_err(|e| LoadError::io(dir, &e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_data_files(root, &path, files)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        ) {
            files.push(path);
        }
    }

    Ok(())
}

/// Derives the leaf-key prefix for a data file from its relative path.
fn file_key_prefix(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let without_ext = relative.with_extension("");
    without_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Flattens a value tree into leaf keys under the given prefix.
///
/// Empty mappings flatten to nothing: an empty data file (or an empty
/// mapping nested within one) carries no state, so it contributes no leaf
/// key and can never collide with populated data on the other side.
fn flatten_into(prefix: &str, value: &DataValue, leaves: &mut BTreeMap<String, DataValue>) {
    match value {
        DataValue::Mapping(map) => {
            for (key, nested) in map {
                let child = format!("{prefix}{KEY_SEPARATOR}{key}");
                flatten_into(&child, nested, leaves);
            }
        }
        other => {
            leaves.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Splits a full leaf key into its file component and in-file key path.
///
/// The file component is everything before the first `::`; the remainder is
/// the nested key path inside that file. A key with no `::` addresses the
/// whole file.
#[must_use]
pub fn split_key(key: &str) -> (&str, Vec<&str>) {
    key.split_once(KEY_SEPARATOR).map_or_else(
        || (key, Vec::new()),
        |(file, rest)| (file, rest.split(KEY_SEPARATOR).collect()),
    )
}

/// Rebuilds the nested mapping under `prefix` from a flat leaf map.
///
/// Used when reporting a kind conflict: the scalar side is shown against the
/// whole subtree it collides with.
#[must_use]
pub fn subtree(leaves: &BTreeMap<String, DataValue>, prefix: &str) -> DataValue {
    let nested_prefix = format!("{prefix}{KEY_SEPARATOR}");
    let mut out = DataValue::Mapping(BTreeMap::new());

    for (key, value) in leaves.range(nested_prefix.clone()..) {
        let Some(rest) = key.strip_prefix(&nested_prefix) else {
            break;
        };
        let path: Vec<&str> = rest.split(KEY_SEPARATOR).collect();
        out.set_path(&path, value.clone());
    }

    out
}

/// Collects every strict mapping prefix implied by a flat leaf map.
///
/// A leaf `a::b::c` implies mapping prefixes `a` and `a::b`. The file
/// component counts as a prefix too: a whole-file scalar on one side can
/// collide with a mapping-rooted file on the other.
#[must_use]
pub fn mapping_prefixes(leaves: &BTreeMap<String, DataValue>) -> std::collections::BTreeSet<String> {
    let mut prefixes = std::collections::BTreeSet::new();

    for key in leaves.keys() {
        let mut from = 0;
        while let Some(pos) = key[from..].find(KEY_SEPARATOR) {
            let end = from + pos;
            prefixes.insert(key[..end].to_string());
            from = end + KEY_SEPARATOR.len();
        }
    }

    prefixes
}
