use std::sync::Arc;

use reposync_config::config::Config;
use reposync_core::{sync_repository, SyncReport};
use reposync_events::{ChannelSink, EventSinkHandle};
use reposync_utils::bytes::format_bytes;
use tracing::{info, warn};

use crate::{
    error::{CliError, CliResult},
    progress::{self, spawn_event_handler},
};

/// Syncs the named repositories, or every enabled one, one after another.
///
/// A failing repository does not stop the others; the command fails once all of them
/// have been attempted.
pub fn sync_repositories(config: &Config, names: &[String]) -> CliResult<()> {
    let repositories = config.select_repositories(names)?;
    if repositories.is_empty() {
        warn!("No enabled repositories are configured. Run `reposync defconfig` to get started.");
        return Ok(());
    }

    let storage_root = config.get_storage_path()?;

    let (sink, receiver) = ChannelSink::new();
    let events: EventSinkHandle = Arc::new(sink);
    let guard = spawn_event_handler(receiver);

    let mut total = SyncReport::default();
    let mut failed = Vec::new();
    let mut reports = Vec::new();

    for repo in &repositories {
        match sync_repository(repo, &storage_root, events.clone()) {
            Ok(report) => {
                total.downloaded += report.downloaded;
                total.recycled += report.recycled;
                total.skipped += report.skipped;
                total.bytes += report.bytes;
                reports.push(report);
            }
            Err(err) => {
                let report = miette::Report::new(err);
                progress::suspend(|| eprintln!("{report:?}"));
                failed.push(repo.name.clone());
            }
        }
    }

    drop(events);
    guard.finish();
    progress::stop();

    if reports.len() > 1 {
        info!(
            "{} repositories synced: {} downloaded, {} unchanged, {} skipped ({} fetched)",
            reports.len(),
            total.downloaded,
            total.recycled,
            total.skipped,
            format_bytes(total.bytes, 2)
        );
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::SyncFailed(failed))
    }
}
