//! Sync engine for reposync.
//!
//! [`Syncer`] mirrors one rpm-md repository into a [`ContentStore`]: it fetches the
//! index and metadata, decides per package whether to download, recycle or skip it,
//! and commits the result as a new generation. [`sync_repository`] wires it to HTTP
//! and the on-disk store for a configured repository.
//!
//! [`ContentStore`]: reposync_store::ContentStore

pub mod classify;
pub mod error;
pub mod sync;
pub mod syncer;

#[cfg(test)]
mod test_utils;

pub use classify::{classify, ArchitectureFilter, Classification};
pub use error::{SyncError, SyncResult};
pub use sync::sync_repository;
pub use syncer::{SyncReport, Syncer, SIGNATURE_PATHS};
