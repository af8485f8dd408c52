use std::path::PathBuf;

use miette::Diagnostic;
use reposync_utils::error::{FileSystemError, HashError, LockError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error("File not found in store: {path}")]
    #[diagnostic(code(reposync_store::file_not_found))]
    FileNotFound { path: String },

    #[error("Failed to compute checksum of {path}")]
    #[diagnostic(code(reposync_store::checksum))]
    Checksum {
        path: String,
        #[source]
        source: HashError,
    },

    #[error("Failed to recycle {path}: {reason}")]
    #[diagnostic(code(reposync_store::recycle))]
    Recycle { path: String, reason: String },

    #[error("Failed to commit generation while {action}: {source}")]
    #[diagnostic(
        code(reposync_store::commit),
        help("The previously committed generation was left in place")
    )]
    Commit {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    #[diagnostic(code(reposync_store::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store at {} is locked by another sync", .path.display())]
    #[diagnostic(
        code(reposync_store::locked),
        help("Wait for the other sync to finish or remove a stale lock file")
    )]
    Locked { path: PathBuf },

    #[error("Invalid repo-relative path {path:?}: {reason}")]
    #[diagnostic(code(reposync_store::invalid_path))]
    InvalidPath { path: String, reason: &'static str },

    #[error(transparent)]
    #[diagnostic(code(reposync_store::lock))]
    Lock(#[from] LockError),

    #[error(transparent)]
    #[diagnostic(code(reposync_store::filesystem))]
    FileSystem(#[from] FileSystemError),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(reposync_store::io))]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::FileNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::FileNotFound {
            path: "pkgs/a-1.0.rpm".to_string(),
        };
        assert_eq!(err.to_string(), "File not found in store: pkgs/a-1.0.rpm");
        assert!(err.is_not_found());

        let err = StoreError::InvalidPath {
            path: "../etc/passwd".to_string(),
            reason: "parent directory components are not allowed",
        };
        assert!(err.to_string().contains("\"../etc/passwd\""));
        assert!(!err.is_not_found());

        let err = StoreError::Locked {
            path: PathBuf::from("/srv/mirror/base.lock"),
        };
        assert_eq!(
            err.to_string(),
            "Store at /srv/mirror/base.lock is locked by another sync"
        );
    }

    #[test]
    fn test_checksum_error_source() {
        let err = StoreError::Checksum {
            path: "pkgs/a.rpm".to_string(),
            source: HashError::UnsupportedAlgorithm {
                path: PathBuf::from("/srv/mirror/base/pkgs/a.rpm"),
                algorithm: "unknown".to_string(),
            },
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
