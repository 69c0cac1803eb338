//! Module tree hashing for change detection.
//!
//! Plain (non-repository) modules have no revision reference, so their
//! identity for comparison is a deterministic SHA-256 digest over the module
//! file tree: relative paths and file contents, walked in sorted order.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::LoadError;

/// Hasher for computing module tree digests.
#[derive(Debug, Default)]
pub struct TreeHasher;

impl TreeHasher {
    /// Creates a new tree hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hex-encoded SHA-256 digest of the file tree at `root`.
    ///
    /// Repository metadata (`.git`) is excluded so that two checkouts of the
    /// same content hash identically regardless of local git state.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if any file or directory cannot be read.
    pub fn hash_tree(&self, root: &Path) -> Result<String, LoadError> {
        let mut hasher = Sha256::new();
        Self::hash_dir(root, root, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    }

    /// Hashes one directory level in sorted entry order.
    fn hash_dir(root: &Path, dir: &Path, hasher: &mut Sha256) -> Result<(), LoadError> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| LoadError::io(dir, &e))?
            .collect::<std::io::Result<_>>()
            .map_err(|e| LoadError::io(dir, &e))?;
        entries.sort_by_key(std::fs::DirEntry::file_name);

        for entry in entries {
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()) == Some(".git") {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(&path);
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update([0u8]);

            if path.is_dir() {
                Self::hash_dir(root, &path, hasher)?;
            } else {
                let content = std::fs::read(&path).map_err(|e| LoadError::io(&path, &e))?;
                hasher.update((content.len() as u64).to_be_bytes());
                hasher.update(&content);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    }

    #[test]
    fn test_identical_trees_hash_identically() {
        let a = TempDir::new().expect("temp dir");
        let b = TempDir::new().expect("temp dir");
        for dir in [a.path(), b.path()] {
            write(dir, "manifests/init.pp", "class foo {}\n");
            write(dir, "files/motd", "welcome\n");
        }

        let hasher = TreeHasher::new();
        assert_eq!(
            hasher.hash_tree(a.path()).expect("hash"),
            hasher.hash_tree(b.path()).expect("hash")
        );
    }

    #[test]
    fn test_content_change_changes_hash() {
        let a = TempDir::new().expect("temp dir");
        let b = TempDir::new().expect("temp dir");
        write(a.path(), "manifests/init.pp", "class foo {}\n");
        write(b.path(), "manifests/init.pp", "class foo { $x = 1 }\n");

        let hasher = TreeHasher::new();
        assert_ne!(
            hasher.hash_tree(a.path()).expect("hash"),
            hasher.hash_tree(b.path()).expect("hash")
        );
    }

    #[test]
    fn test_git_metadata_is_excluded() {
        let a = TempDir::new().expect("temp dir");
        let b = TempDir::new().expect("temp dir");
        write(a.path(), "manifests/init.pp", "class foo {}\n");
        write(b.path(), "manifests/init.pp", "class foo {}\n");
        write(b.path(), ".git/HEAD", "ref: refs/heads/main\n");

        let hasher = TreeHasher::new();
        assert_eq!(
            hasher.hash_tree(a.path()).expect("hash"),
            hasher.hash_tree(b.path()).expect("hash")
        );
    }
}
