//! Error types for reposync-core.

use miette::Diagnostic;
use reposync_dl::DownloadError;
use reposync_registry::RegistryError;
use reposync_store::StoreError;
use thiserror::Error;

/// A fatal sync failure.
///
/// Every variant wraps the error of the stage that failed without altering it, so
/// callers can still match on e.g. [`DownloadError::is_not_found`].
#[derive(Error, Diagnostic, Debug)]
pub enum SyncError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
