//! Exclusive lock on a working directory for the length of a run

use crate::execution::EngineError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Held for the whole run; the lock is released when dropped
///
/// The lock file lives in the temp dir, keyed by the enclosing git work
/// tree, so nothing is written inside the tree being staged. Lock files
/// are left in place after release: unlinking one while another process
/// has it open would let two runs lock different files for the same tree.
/// There is at most one file per work tree.
#[derive(Debug)]
pub struct WorkdirLock {
    _file: File,
    path: PathBuf,
}

impl WorkdirLock {
    /// Directory the lock is keyed on
    ///
    /// `git add --all` covers the whole work tree whatever subdirectory it
    /// runs from, so this is the nearest ancestor holding `.git`. Falls back
    /// to the canonical directory outside a repository.
    pub fn lock_root(working_dir: &Path) -> PathBuf {
        let canonical =
            std::fs::canonicalize(working_dir).unwrap_or_else(|_| working_dir.to_path_buf());
        canonical
            .ancestors()
            .find(|dir| dir.join(".git").exists())
            .map(Path::to_path_buf)
            .unwrap_or(canonical)
    }

    /// Lock file location for a working directory
    pub fn lock_path(working_dir: &Path) -> PathBuf {
        let root = Self::lock_root(working_dir);
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, root.to_string_lossy().as_bytes());
        std::env::temp_dir().join(format!("autopush-{}.lock", id))
    }

    /// Take the lock without blocking
    pub fn acquire(working_dir: &Path) -> Result<Self, EngineError> {
        let path = Self::lock_path(working_dir);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| EngineError::Lock {
                path: path.clone(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(
                    "Acquired working directory lock {} for {}",
                    path.display(),
                    working_dir.display()
                );
                Ok(Self { _file: file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(EngineError::WorkdirBusy(working_dir.to_path_buf()))
            }
            Err(source) => Err(EngineError::Lock { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
