//! Environment model: on-disk tree loading and structural representation.

mod hash;
mod hiera;
mod loader;
mod model;
mod revision;

pub use hash::TreeHasher;
pub use hiera::{
    load_file, load_tree, mapping_prefixes, split_key, subtree, write_file, DataValue,
    KEY_SEPARATOR,
};
pub use loader::EnvironmentLoader;
pub use model::{Environment, ModuleKind, PuppetModule};
pub use revision::{GitMetadataStore, RevisionStore};

#[cfg(test)]
pub use revision::MockRevisionStore;
