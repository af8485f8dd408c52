/// All event types emitted while syncing a repository.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A repository sync is starting.
    SyncStarting { repo_name: String, url: String },
    /// The orchestrator moved to another stage.
    Stage { repo_name: String, stage: SyncStage },
    /// A remote file is being fetched and stored.
    Fetching { repo_name: String, path: String },
    /// A remote file has been fetched and stored completely.
    Fetched {
        repo_name: String,
        path: String,
        bytes: u64,
    },
    /// An optional file is absent on the remote (404).
    OptionalMissing { repo_name: String, path: String },
    /// A package from the primary manifest has been classified.
    PackageClassified {
        repo_name: String,
        location: String,
        decision: PackageDecision,
    },
    /// Package download stage progress.
    DownloadProgress {
        repo_name: String,
        completed: usize,
        total: usize,
    },
    /// The new generation has been committed.
    SyncComplete {
        repo_name: String,
        downloaded: usize,
        recycled: usize,
        skipped: usize,
        bytes: u64,
    },
    /// The sync was aborted.
    SyncFailed { repo_name: String, error: String },
    /// Log message.
    Log { level: LogLevel, message: String },
}

/// Sync stages, in the order they run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStage {
    /// Fetching the repository index and every metadata file it references.
    Metadata,
    /// Fetching the optional signature and key files.
    Signatures,
    /// Downloading new or changed packages.
    Downloading { total: usize },
    /// Retaining unchanged packages from the previous generation.
    Recycling { total: usize },
    /// Promoting the new generation.
    Committing,
}

/// Outcome of comparing a remote package with the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageDecision {
    /// The package must be fetched.
    Download(DownloadReason),
    /// The stored copy is up to date and is kept.
    Recycle,
    /// The stored copy could not be checked; the package is left out of this generation.
    Skip { reason: String },
}

/// Why a package is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadReason {
    /// No stored copy exists.
    Missing,
    /// The stored copy does not hash to the published checksum.
    ChecksumMismatch { remote: String, local: String },
    /// The published checksum uses an algorithm that cannot be verified locally.
    UnknownAlgorithm,
}

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}
