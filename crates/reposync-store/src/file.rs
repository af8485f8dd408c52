//! On-disk [`ContentStore`] with crash-tolerant generation swaps.
//!
//! For a store rooted at `R` the following siblings are used:
//!
//! - `R/`: the committed generation, mirroring the remote layout.
//! - `R.staging/`: the generation being built by the current sync.
//! - `R.old/`: the previous generation, only present while a commit is in progress.
//! - `R.lock`: exclusive lock held for the lifetime of the store handle.

use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use reposync_utils::{
    fs::{ensure_dir_exists, link_or_copy, safe_remove},
    hash::{calculate_checksum, ChecksumType},
    lock::FileLock,
    stream::StreamConsumer,
};
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::{
    error::{Result, StoreError},
    path::{join_relative, sibling},
    store::ContentStore,
};

pub struct FileStore {
    root: PathBuf,
    staging: PathBuf,
    old: PathBuf,
    lock: FileLock,
}

impl FileStore {
    /// Opens the store rooted at `root`, creating it if needed.
    ///
    /// Recovers from a commit that was interrupted half-way and throws away whatever a
    /// previous, unfinished sync left in the staging area.
    ///
    /// # Errors
    ///
    /// * [`StoreError::Locked`] if another handle holds the store lock.
    /// * [`StoreError::InvalidPath`] if `root` has no final component.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root: PathBuf = root.as_ref().components().collect();
        if root.file_name().is_none() {
            return Err(StoreError::InvalidPath {
                path: root.display().to_string(),
                reason: "store root must name a directory",
            });
        }

        let lock_path = sibling(&root, ".lock");
        let lock = FileLock::try_acquire(&lock_path)?.ok_or_else(|| {
            StoreError::Locked {
                path: lock_path.clone(),
            }
        })?;

        let store = Self {
            staging: sibling(&root, ".staging"),
            old: sibling(&root, ".old"),
            root,
            lock,
        };
        store.recover()?;

        debug!(
            root = %store.root.display(),
            lock = %store.lock.path().display(),
            "opened store"
        );
        Ok(store)
    }

    /// Directory holding the committed generation.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the generation being built.
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    fn recover(&self) -> Result<()> {
        if self.old.exists() {
            if self.root.exists() {
                debug!(path = %self.old.display(), "removing leftover previous generation");
                safe_remove(&self.old)?;
            } else {
                warn!(
                    path = %self.old.display(),
                    "restoring previous generation after an interrupted commit"
                );
                fs::rename(&self.old, &self.root).map_err(|source| {
                    StoreError::Io {
                        action: format!("restoring {}", self.old.display()),
                        source,
                    }
                })?;
            }
        }

        if self.staging.exists() {
            debug!(path = %self.staging.display(), "discarding stale staging area");
            safe_remove(&self.staging)?;
        }

        ensure_dir_exists(&self.root)?;
        Ok(())
    }
}

impl ContentStore for FileStore {
    fn writer(
        &mut self,
        path: &str,
        expected_checksum: &str,
    ) -> Result<Box<dyn StreamConsumer>> {
        let target = join_relative(&self.staging, path)?;
        let parent = target.parent().unwrap_or(self.staging.as_path());
        ensure_dir_exists(parent)?;

        let file = tempfile::Builder::new()
            .prefix(".reposync-")
            .tempfile_in(parent)
            .map_err(|source| {
                StoreError::Write {
                    path: path.to_string(),
                    source,
                }
            })?;

        Ok(Box::new(StagedFile {
            path: path.to_string(),
            expected_checksum: expected_checksum.to_string(),
            writer: BufWriter::new(file),
            target,
        }))
    }

    fn checksum(&self, path: &str, algorithm: ChecksumType) -> Result<String> {
        let full = join_relative(&self.root, path)?;
        let not_found = || {
            StoreError::FileNotFound {
                path: path.to_string(),
            }
        };

        if let Err(err) = fs::metadata(&full) {
            if err.kind() == io::ErrorKind::NotFound {
                return Err(not_found());
            }
        }

        calculate_checksum(&full, algorithm).map_err(|source| {
            if source.is_not_found() {
                not_found()
            } else {
                StoreError::Checksum {
                    path: path.to_string(),
                    source,
                }
            }
        })
    }

    fn recycle(&mut self, path: &str) -> Result<()> {
        let committed = join_relative(&self.root, path)?;
        let staged = join_relative(&self.staging, path)?;

        if !committed.is_file() {
            return Err(StoreError::Recycle {
                path: path.to_string(),
                reason: "not present in the committed generation".to_string(),
            });
        }

        link_or_copy(&committed, &staged).map_err(|err| {
            StoreError::Recycle {
                path: path.to_string(),
                reason: err.to_string(),
            }
        })?;

        trace!(path, "recycled");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        ensure_dir_exists(&self.staging)?;

        let had_previous = self.root.exists();
        if had_previous {
            fs::rename(&self.root, &self.old).map_err(|source| {
                StoreError::Commit {
                    action: "retiring the previous generation".to_string(),
                    source,
                }
            })?;
        }

        if let Err(source) = fs::rename(&self.staging, &self.root) {
            if had_previous {
                if let Err(err) = fs::rename(&self.old, &self.root) {
                    warn!(
                        path = %self.old.display(),
                        "failed to put the previous generation back: {err}"
                    );
                }
            }
            return Err(StoreError::Commit {
                action: "promoting the new generation".to_string(),
                source,
            });
        }

        if had_previous {
            if let Err(err) = safe_remove(&self.old) {
                warn!("{err}; it will be removed the next time the store is opened");
            }
        }

        debug!(root = %self.root.display(), "committed generation");
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(err) = safe_remove(&self.staging) {
            warn!("failed to discard uncommitted generation: {err}");
        }
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("root", &self.root)
            .field("lock", &self.lock)
            .finish()
    }
}

/// Temporary file in the staging area, renamed onto its target once finished.
struct StagedFile {
    path: String,
    expected_checksum: String,
    writer: BufWriter<NamedTempFile>,
    target: PathBuf,
}

impl StreamConsumer for StagedFile {
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.writer.write_all(chunk)
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        let StagedFile {
            path,
            expected_checksum,
            writer,
            target,
        } = *self;

        let file = writer.into_inner().map_err(|err| err.into_error())?;
        file.persist(&target).map_err(|err| err.error)?;

        trace!(path = %path, expected = %expected_checksum, "staged");
        Ok(())
    }
}
