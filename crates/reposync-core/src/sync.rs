use std::path::Path;

use reposync_config::repository::Repository;
use reposync_dl::HttpFetcher;
use reposync_events::EventSinkHandle;
use reposync_store::FileStore;
use tracing::debug;

use crate::{
    classify::ArchitectureFilter,
    error::SyncResult,
    syncer::{SyncReport, Syncer},
};

/// Syncs a configured repository over HTTP into `storage_root/<name>`.
///
/// # Errors
///
/// Fails with the store's lock error if another sync holds the repository, or with the
/// first fatal error of the sync itself.
pub fn sync_repository(
    repo: &Repository,
    storage_root: &Path,
    events: EventSinkHandle,
) -> SyncResult<SyncReport> {
    let dir = repo.storage_dir(storage_root);
    debug!(repo = %repo.name, dir = %dir.display(), "opening store");

    let store = FileStore::open(&dir)?;
    let filter: ArchitectureFilter = repo.arch_filter().into_iter().collect();

    Syncer::new(&repo.name, &repo.url, HttpFetcher::new(), store)
        .with_filter(filter)
        .with_events(events)
        .run()
}
