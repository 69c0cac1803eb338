//! Module revision state access.
//!
//! Modules that are nested repositories carry a revision reference. Reading
//! and pinning that reference goes through the narrow [`RevisionStore`]
//! trait so the engine never performs version-control operations itself;
//! the default implementation inspects on-disk git metadata only.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::LoadError;

/// Narrow interface to a module's revision state.
///
/// `current` is read-only inspection during environment loading; `pin` is
/// the single write the migration engine performs on a tracked module.
#[cfg_attr(test, mockall::automock)]
pub trait RevisionStore {
    /// Returns the module's current revision reference, or `None` when the
    /// module is not a nested repository.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when repository metadata exists but cannot
    /// be read.
    fn current(&self, module_root: &Path) -> Result<Option<String>, LoadError>;

    /// Pins the module at `module_root` to the given revision.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the revision state cannot be written.
    fn pin(&self, module_root: &Path, revision: &str) -> std::io::Result<()>;
}

/// Revision store backed by on-disk git metadata.
///
/// Detects a nested repository by the presence of `.git` (a directory, or a
/// gitfile containing `gitdir: <path>` as git writes for submodules) and
/// resolves `HEAD` through loose refs and `packed-refs`. Pinning writes a
/// detached `HEAD`, which is the state a checkout of that revision leaves
/// behind.
#[derive(Debug, Default)]
pub struct GitMetadataStore;

impl GitMetadataStore {
    /// Creates a new git metadata store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves the git directory for a module, following gitfiles.
    fn git_dir(module_root: &Path) -> Result<Option<PathBuf>, LoadError> {
        let dot_git = module_root.join(".git");
        if !dot_git.exists() {
            return Ok(None);
        }
        if dot_git.is_dir() {
            return Ok(Some(dot_git));
        }

        // Submodule layout: .git is a file pointing at the real git dir.
        let content =
            std::fs::read_to_string(&dot_git).map_err(|e| LoadError::io(&dot_git, &e))?;
        let Some(target) = content.trim().strip_prefix("gitdir:") else {
            return Err(LoadError::RevisionRead {
                module: module_name(module_root),
                message: format!("unrecognized gitfile content in {}", dot_git.display()),
            });
        };

        let target = target.trim();
        let resolved = if Path::new(target).is_absolute() {
            PathBuf::from(target)
        } else {
            module_root.join(target)
        };
        Ok(Some(resolved))
    }

    /// Resolves a symbolic ref name to a revision within a git directory.
    ///
    /// Falls back to `packed-refs`, and to the ref name itself when the ref
    /// cannot be found (an unborn branch still compares stably by name).
    fn resolve_ref(git_dir: &Path, ref_name: &str) -> Result<String, LoadError> {
        let loose = git_dir.join(ref_name);
        if loose.is_file() {
            let revision =
                std::fs::read_to_string(&loose).map_err(|e| LoadError::io(&loose, &e))?;
            return Ok(revision.trim().to_string());
        }

        let packed = git_dir.join("packed-refs");
        if packed.is_file() {
            let content =
                std::fs::read_to_string(&packed).map_err(|e| LoadError::io(&packed, &e))?;
            for line in content.lines() {
                if line.starts_with('#') || line.starts_with('^') {
                    continue;
                }
                if let Some((revision, name)) = line.split_once(' ') {
                    if name.trim() == ref_name {
                        return Ok(revision.trim().to_string());
                    }
                }
            }
        }

        trace!("Ref {ref_name} not found in {}, using ref name", git_dir.display());
        Ok(ref_name.to_string())
    }
}

impl RevisionStore for GitMetadataStore {
    fn current(&self, module_root: &Path) -> Result<Option<String>, LoadError> {
        let Some(git_dir) = Self::git_dir(module_root)? else {
            return Ok(None);
        };

        let head_path = git_dir.join("HEAD");
        let head = std::fs::read_to_string(&head_path).map_err(|e| LoadError::RevisionRead {
            module: module_name(module_root),
            message: format!("failed to read {}: {e}", head_path.display()),
        })?;
        let head = head.trim();

        let revision = if let Some(ref_name) = head.strip_prefix("ref:") {
            Self::resolve_ref(&git_dir, ref_name.trim())?
        } else {
            head.to_string()
        };

        debug!(
            "Module {} is at revision {revision}",
            module_root.display()
        );
        Ok(Some(revision))
    }

    fn pin(&self, module_root: &Path, revision: &str) -> std::io::Result<()> {
        let git_dir = Self::git_dir(module_root)
            .map_err(|e| std::io::Error::other(e.to_string()))?
            .ok_or_else(|| {
                std::io::Error::other(format!(
                    "module {} is not a nested repository",
                    module_root.display()
                ))
            })?;

        debug!(
            "Pinning module {} to revision {revision}",
            module_root.display()
        );
        std::fs::write(git_dir.join("HEAD"), format!("{revision}\n"))
    }
}

/// Best-effort module name for error messages.
fn module_name(module_root: &Path) -> String {
    module_root
        .file_name()
        .map_or_else(|| module_root.display().to_string(), |n| n.to_string_lossy().into_owned())
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
    fn test_plain_directory_has_no_revision() {
        let temp = TempDir::new().expect("temp dir");
        write(temp.path(), "manifests/init.pp", "class foo {}\n");

        let store = GitMetadataStore::new();
        assert_eq!(store.current(temp.path()).expect("current"), None);
    }

    #[test]
    fn test_detached_head_is_the_revision() {
        let temp = TempDir::new().expect("temp dir");
        write(temp.path(), ".git/HEAD", "0a1b2c3d4e5f\n");

        let store = GitMetadataStore::new();
        assert_eq!(
            store.current(temp.path()).expect("current"),
            Some(String::from("0a1b2c3d4e5f"))
        );
    }

    #[test]
    fn test_symbolic_head_resolves_loose_ref() {
        let temp = TempDir::new().expect("temp dir");
        write(temp.path(), ".git/HEAD", "ref: refs/heads/main\n");
        write(temp.path(), ".git/refs/heads/main", "feedbeef\n");

        let store = GitMetadataStore::new();
        assert_eq!(
            store.current(temp.path()).expect("current"),
            Some(String::from("feedbeef"))
        );
    }

    #[test]
    fn test_symbolic_head_resolves_packed_ref() {
        let temp = TempDir::new().expect("temp dir");
        write(temp.path(), ".git/HEAD", "ref: refs/heads/main\n");
        write(
            temp.path(),
            ".git/packed-refs",
            "# pack-refs with: peeled fully-peeled sorted\ncafef00d refs/heads/main\n",
        );

        let store = GitMetadataStore::new();
        assert_eq!(
            store.current(temp.path()).expect("current"),
            Some(String::from("cafef00d"))
        );
    }

    #[test]
    fn test_gitfile_submodule_layout() {
        let temp = TempDir::new().expect("temp dir");
        let module = temp.path().join("module");
        let gitdir = temp.path().join("gitstore");
        std::fs::create_dir_all(&module).expect("mkdir");
        write(&gitdir, "HEAD", "deadbeef\n");
        std::fs::write(
            module.join(".git"),
            format!("gitdir: {}\n", gitdir.display()),
        )
        .expect("gitfile");

        let store = GitMetadataStore::new();
        assert_eq!(
            store.current(&module).expect("current"),
            Some(String::from("deadbeef"))
        );
    }

    #[test]
    fn test_pin_writes_detached_head() {
        let temp = TempDir::new().expect("temp dir");
        write(temp.path(), ".git/HEAD", "ref: refs/heads/main\n");

        let store = GitMetadataStore::new();
        store.pin(temp.path(), "0123abcd").expect("pin");
        assert_eq!(
            store.current(temp.path()).expect("current"),
            Some(String::from("0123abcd"))
        );
    }

    #[test]
    fn test_pin_fails_for_plain_directory() {
        let temp = TempDir::new().expect("temp dir");
        let store = GitMetadataStore::new();
        assert!(store.pin(temp.path(), "0123abcd").is_err());
    }
}
