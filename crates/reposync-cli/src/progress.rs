use std::{
    collections::HashMap,
    sync::{mpsc::Receiver, Arc, LazyLock},
    thread::JoinHandle,
    time::Duration,
};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nu_ansi_term::Color::{Cyan, Green, Red};
use reposync_events::{DownloadReason, LogLevel, PackageDecision, SyncEvent, SyncStage};
use reposync_utils::bytes::format_bytes;
use tracing::{debug, error, info, trace, warn};

use crate::utils::{progress_enabled, Colored, Icons};

/// Shared MultiProgress instance for suspend/stop from other modules.
static MULTI: LazyLock<Arc<MultiProgress>> = LazyLock::new(|| Arc::new(MultiProgress::new()));

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Stop and clear all progress bars.
pub fn stop() {
    MULTI.clear().ok();
}

/// Owns the background thread started by [`spawn_event_handler`].
pub struct ProgressGuard {
    handle: Option<JoinHandle<()>>,
}

impl ProgressGuard {
    /// Waits for the handler thread to drain the remaining events.
    ///
    /// Every sender of the channel must be dropped first, otherwise this blocks forever.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn download_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {prefix}  {wide_bar:.cyan/dim}  {pos}/{len} packages  {eta}  {msg:.dim}",
    )
    .map(|style| style.progress_chars("━━─"))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn new_bar(bar: ProgressBar) -> ProgressBar {
    if progress_enabled() {
        MULTI.add(bar)
    } else {
        MULTI.add(ProgressBar::hidden())
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = new_bar(ProgressBar::new_spinner());
    pb.set_style(spinner_style());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn create_download_bar(repo_name: &str, total: usize) -> ProgressBar {
    let pb = new_bar(ProgressBar::new(total as u64));
    pb.set_style(download_style());
    pb.set_prefix(Colored(Cyan, repo_name).to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn stage_message(repo_name: &str, stage: &SyncStage) -> String {
    match stage {
        SyncStage::Metadata => format!("{repo_name}: fetching metadata"),
        SyncStage::Signatures => format!("{repo_name}: fetching signatures"),
        SyncStage::Downloading { total } => format!("{repo_name}: downloading {total} packages"),
        SyncStage::Recycling { total } => format!("{repo_name}: keeping {total} unchanged packages"),
        SyncStage::Committing => format!("{repo_name}: committing"),
    }
}

fn describe_download(reason: &DownloadReason) -> String {
    match reason {
        DownloadReason::Missing => "new".to_string(),
        DownloadReason::ChecksumMismatch { remote, local } => {
            format!("changed (remote {remote}, local {local})")
        }
        DownloadReason::UnknownAlgorithm => "checksum cannot be verified locally".to_string(),
    }
}

/// Spawns a thread that renders [`SyncEvent`]s as log lines, with one spinner per
/// repository and a package bar during the download stage.
pub fn spawn_event_handler(receiver: Receiver<SyncEvent>) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        let mut spinners: HashMap<String, ProgressBar> = HashMap::new();
        let mut downloads: HashMap<String, ProgressBar> = HashMap::new();

        while let Ok(event) = receiver.recv() {
            match event {
                SyncEvent::SyncStarting { repo_name, url } => {
                    info!("Syncing {} from {url}", Colored(Cyan, &repo_name));
                }
                SyncEvent::Stage { repo_name, stage } => {
                    let message = stage_message(&repo_name, &stage);
                    debug!("{message}");

                    if let Some(pb) = downloads.remove(&repo_name) {
                        pb.finish_and_clear();
                    }
                    match stage {
                        SyncStage::Downloading { total } if total > 0 => {
                            if let Some(pb) = spinners.remove(&repo_name) {
                                pb.finish_and_clear();
                            }
                            downloads.insert(repo_name.clone(), create_download_bar(&repo_name, total));
                        }
                        _ => {
                            let pb = spinners
                                .entry(repo_name)
                                .or_insert_with(|| create_spinner(message.clone()));
                            pb.set_message(message);
                        }
                    }
                }
                SyncEvent::Fetching { repo_name, path } => {
                    trace!("{repo_name}: fetching {path}");
                    if let Some(pb) = downloads.get(&repo_name) {
                        pb.set_message(path);
                    }
                }
                SyncEvent::Fetched { repo_name, path, bytes } => {
                    debug!("{repo_name}: stored {path} ({})", format_bytes(bytes, 2));
                }
                SyncEvent::OptionalMissing { repo_name, path } => {
                    debug!("{repo_name}: {path} is not published");
                }
                SyncEvent::PackageClassified {
                    repo_name,
                    location,
                    decision,
                } => {
                    match decision {
                        PackageDecision::Download(reason) => {
                            debug!("{repo_name}: {location}: {}", describe_download(&reason));
                        }
                        PackageDecision::Recycle => trace!("{repo_name}: {location}: up to date"),
                        PackageDecision::Skip { reason } => {
                            warn!("{repo_name}: skipping {location}: {reason}");
                        }
                    }
                }
                SyncEvent::DownloadProgress {
                    repo_name,
                    completed,
                    ..
                } => {
                    if let Some(pb) = downloads.get(&repo_name) {
                        pb.set_position(completed as u64);
                    }
                }
                SyncEvent::SyncComplete {
                    repo_name,
                    downloaded,
                    recycled,
                    skipped,
                    bytes,
                } => {
                    for pb in [spinners.remove(&repo_name), downloads.remove(&repo_name)]
                        .into_iter()
                        .flatten()
                    {
                        pb.finish_and_clear();
                    }
                    let skipped = if skipped > 0 {
                        format!(", {skipped} skipped")
                    } else {
                        String::new()
                    };
                    info!(
                        " {} {}: {downloaded} downloaded, {recycled} unchanged{skipped} ({} fetched)",
                        Colored(Green, Icons::CHECK),
                        Colored(Cyan, &repo_name),
                        format_bytes(bytes, 2)
                    );
                }
                SyncEvent::SyncFailed { repo_name, error } => {
                    for pb in [spinners.remove(&repo_name), downloads.remove(&repo_name)]
                        .into_iter()
                        .flatten()
                    {
                        pb.finish_and_clear();
                    }
                    error!(
                        " {} {}: {}",
                        Colored(Red, Icons::CROSS),
                        Colored(Cyan, &repo_name),
                        Colored(Red, error)
                    );
                }
                SyncEvent::Log { level, message } => {
                    match level {
                        LogLevel::Debug => debug!("{message}"),
                        LogLevel::Info => info!("{message}"),
                        LogLevel::Warning => warn!("{message}"),
                        LogLevel::Error => error!("{message}"),
                    }
                }
            }
        }

        for (_, pb) in spinners.into_iter().chain(downloads) {
            pb.finish_and_clear();
        }
    });

    ProgressGuard {
        handle: Some(handle),
    }
}
