//! Exclusive advisory file locks
//!
//! A lock on `<path>` is taken on a co-located `<path>.lock` file so the guarded
//! file itself can be replaced by rename while the lock is held.

use crate::error::{BootError, BootResult};
use fs4::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Guard holding an exclusive lock; released on drop
#[derive(Debug)]
pub struct LockedFile {
    /// Open for as long as the lock is held
    _file: File,
    path: PathBuf,
}

impl LockedFile {
    /// Block until the exclusive lock guarding `target` is acquired
    pub fn acquire(target: &Path) -> BootResult<Self> {
        let path = lock_path(target);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BootError::io(format!("creating lock directory {}", parent.display()), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| BootError::io(format!("opening lock {}", path.display()), e))?;

        file.lock_exclusive()
            .map_err(|e| BootError::io(format!("locking {}", path.display()), e))?;

        debug!("Acquired lock {}", path.display());
        Ok(Self { _file: file, path })
    }

    /// [`acquire`](Self::acquire) on the blocking pool, for async callers
    pub async fn acquire_async(target: &Path) -> BootResult<Self> {
        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || Self::acquire(&target))
            .await
            .map_err(|e| BootError::Internal(format!("lock task failed: {}", e)))?
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock
        debug!("Released lock {}", self.path.display());
    }
}

/// Lock file co-located with `target`
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}
