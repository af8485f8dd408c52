//! File-based locking mechanism for preventing concurrent operations.
//!
//! A store directory may only be synced by one process at a time. The lock is an
//! `flock` held on a sibling `.lock` file for as long as the [`FileLock`] lives.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use crate::{
    error::{LockError, LockResult},
    fs::ensure_dir_exists,
};

/// A file-based lock using `flock`.
///
/// The lock is automatically released when `FileLock` is dropped.
pub struct FileLock {
    _file: nix::fcntl::Flock<File>,
    path: PathBuf,
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock")
            .field("path", &self.path)
            .finish()
    }
}

impl FileLock {
    fn open(lock_path: &Path) -> LockResult<File> {
        if let Some(parent) = lock_path.parent() {
            ensure_dir_exists(parent)
                .map_err(|err| LockError::AcquireFailed(err.to_string()))?;
        }

        Ok(OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?)
    }

    /// Try to acquire an exclusive lock without blocking.
    ///
    /// Returns `None` if the lock is already held by someone else.
    pub fn try_acquire<P: AsRef<Path>>(lock_path: P) -> LockResult<Option<Self>> {
        let lock_path = lock_path.as_ref();
        let file = Self::open(lock_path)?;

        match nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusiveNonblock) {
            Ok(file) => {
                Ok(Some(FileLock {
                    path: lock_path.to_path_buf(),
                    _file: file,
                }))
            }
            Err((_, err)) => {
                if matches!(err, nix::errno::Errno::EWOULDBLOCK) {
                    return Ok(None);
                }
                Err(LockError::AcquireFailed(format!(
                    "{}: {}",
                    lock_path.display(),
                    err
                )))
            }
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
