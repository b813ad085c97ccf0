//! C3 — Object Store: a path-keyed byte store scoped to a private
//! application directory.
//!
//! The store never sees plaintext; it handles opaque bytes under logical
//! names such as `meta/real` or `file/<id>`. Modeled as a trait so the
//! Vault Manager can be exercised against an in-memory fake in tests and a
//! real filesystem-backed store in production — the capability-focused
//! interface the redesign notes call for, in place of one god-object.

use crate::error::VaultError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::instrument;

/// The two subtrees the spec reserves: per-item file payloads and
/// per-identity metadata indexes.
pub const FILE_PREFIX: &str = "file";
pub const META_PREFIX: &str = "meta";

/// A path-keyed byte store. `logical_name` values look like `meta/real` or
/// `file/<id>` — forward-slash separated, relative to the store root.
pub trait ObjectStore: Send + Sync {
    /// Atomically write `bytes` under `logical_name`. On platforms that
    /// support atomic rename, a failed `put` must leave the prior version
    /// (if any) intact.
    fn put(&self, logical_name: &str, bytes: &[u8]) -> Result<(), VaultError>;

    /// Read the bytes stored under `logical_name`.
    ///
    /// # Errors
    /// Returns `VaultError::NotFound` if no object exists at that name.
    fn get(&self, logical_name: &str) -> Result<Vec<u8>, VaultError>;

    /// Delete the object at `logical_name`. Idempotent: deleting a name
    /// that does not exist is not an error.
    fn delete(&self, logical_name: &str) -> Result<(), VaultError>;

    /// List every logical name under `prefix` (e.g. `"file"` or `"meta"`).
    fn list(&self, prefix: &str) -> Result<Vec<String>, VaultError>;

    /// Recursively delete the entire vault root, leaving nothing behind.
    fn wipe_tree(&self) -> Result<(), VaultError>;
}

// ---------------------------------------------------------------------------
// Filesystem-backed store
// ---------------------------------------------------------------------------

/// An [`ObjectStore`] backed by `std::fs`, with atomic writes implemented
/// via write-to-temp-then-rename in the same directory as the target file
/// (so the rename is on the same filesystem and therefore atomic on
/// platforms that support it).
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (creating if necessary) a filesystem object store rooted at
    /// `root`, with the `file/` and `meta/` subtrees present.
    ///
    /// # Errors
    /// Returns `VaultError::Io` if directory creation fails.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(FILE_PREFIX))?;
        std::fs::create_dir_all(root.join(META_PREFIX))?;
        Ok(Self { root })
    }

    fn resolve(&self, logical_name: &str) -> Result<PathBuf, VaultError> {
        if logical_name.contains("..") {
            return Err(VaultError::ConstraintViolated(format!(
                "logical name must not contain '..': {logical_name}"
            )));
        }
        Ok(self.root.join(logical_name))
    }
}

impl ObjectStore for FsObjectStore {
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    fn put(&self, logical_name: &str, bytes: &[u8]) -> Result<(), VaultError> {
        let path = self.resolve(logical_name)?;
        let dir = path.parent().ok_or_else(|| {
            VaultError::ConstraintViolated(format!("logical name has no parent: {logical_name}"))
        })?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .map_err(|e| VaultError::Io(e.error))?;
        tracing::debug!(name = logical_name, "object store: put committed");
        Ok(())
    }

    fn get(&self, logical_name: &str) -> Result<Vec<u8>, VaultError> {
        let path = self.resolve(logical_name)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(logical_name.to_string()))
            }
            Err(e) => Err(VaultError::Io(e)),
        }
    }

    fn delete(&self, logical_name: &str) -> Result<(), VaultError> {
        let path = self.resolve(logical_name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::Io(e)),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, VaultError> {
        let dir = self.root.join(prefix);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(format!("{prefix}/{name}"));
                }
            }
        }
        Ok(names)
    }

    #[instrument(skip(self))]
    fn wipe_tree(&self) -> Result<(), VaultError> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        std::fs::create_dir_all(self.root.join(FILE_PREFIX))?;
        std::fs::create_dir_all(self.root.join(META_PREFIX))?;
        tracing::info!("object store: vault tree wiped");
        Ok(())
    }
}

/// Ensure `path`'s directory exists. Exposed for callers (e.g. the
/// credential registry) that write single files outside the `file`/`meta`
/// subtrees but still want create-dir-all semantics.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), VaultError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store (tests)
// ---------------------------------------------------------------------------

/// An in-memory [`ObjectStore`] for unit tests that don't need real disk
/// I/O, following the injected-handle testability pattern.
#[derive(Default)]
pub struct MemObjectStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemObjectStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for MemObjectStore {
    fn put(&self, logical_name: &str, bytes: &[u8]) -> Result<(), VaultError> {
        let mut data = self.data.lock().expect("object store mutex poisoned");
        data.insert(logical_name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, logical_name: &str) -> Result<Vec<u8>, VaultError> {
        let data = self.data.lock().expect("object store mutex poisoned");
        data.get(logical_name)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(logical_name.to_string()))
    }

    fn delete(&self, logical_name: &str) -> Result<(), VaultError> {
        let mut data = self.data.lock().expect("object store mutex poisoned");
        data.remove(logical_name);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, VaultError> {
        let data = self.data.lock().expect("object store mutex poisoned");
        let want_prefix = format!("{prefix}/");
        Ok(data
            .keys()
            .filter(|k| k.starts_with(&want_prefix))
            .cloned()
            .collect())
    }

    fn wipe_tree(&self) -> Result<(), VaultError> {
        let mut data = self.data.lock().expect("object store mutex poisoned");
        data.clear();
        Ok(())
    }
}
