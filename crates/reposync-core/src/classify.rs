//! Per-package decisions: download, recycle or skip.

use std::collections::HashSet;

use reposync_events::{DownloadReason, PackageDecision};
use reposync_registry::PackageRecord;
use reposync_store::ContentStore;

/// Architecture accepted by every filter.
pub const NOARCH: &str = "noarch";

/// Set of package architectures a sync accepts. An empty filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchitectureFilter {
    archs: HashSet<String>,
}

impl ArchitectureFilter {
    pub fn new<I, S>(archs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            archs: archs.into_iter().map(Into::into).collect(),
        }
    }

    /// A filter that accepts every architecture.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.archs.is_empty()
    }

    pub fn accepts(&self, arch: &str) -> bool {
        arch == NOARCH || self.archs.is_empty() || self.archs.contains(arch)
    }
}

impl<S: Into<String>> FromIterator<S> for ArchitectureFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Compares `record` against the committed copy in `store`.
///
/// The remote checksum is authoritative. A record whose algorithm cannot be computed
/// locally is always downloaded and the store is not consulted. A lookup failure
/// other than a missing file skips the package.
pub fn classify<S>(record: &PackageRecord, store: &S) -> PackageDecision
where
    S: ContentStore + ?Sized,
{
    if !record.checksum_type.is_known() {
        return PackageDecision::Download(DownloadReason::UnknownAlgorithm);
    }

    match store.checksum(&record.location, record.checksum_type) {
        Ok(local) if local.eq_ignore_ascii_case(record.checksum.trim()) => {
            PackageDecision::Recycle
        }
        Ok(local) => {
            PackageDecision::Download(DownloadReason::ChecksumMismatch {
                remote: record.checksum.clone(),
                local,
            })
        }
        Err(err) if err.is_not_found() => PackageDecision::Download(DownloadReason::Missing),
        Err(err) => {
            PackageDecision::Skip {
                reason: err.to_string(),
            }
        }
    }
}

/// Packages of one sync, partitioned by decision.
///
/// Skipped packages are only counted; they are in neither list.
#[derive(Debug, Default)]
pub struct Classification {
    pub to_download: Vec<PackageRecord>,
    pub to_recycle: Vec<PackageRecord>,
    skipped: usize,
    locations: HashSet<String>,
}

impl Classification {
    /// Whether a package at `location` has already been classified.
    pub fn contains(&self, location: &str) -> bool {
        self.locations.contains(location)
    }

    /// Files `record` under `decision`.
    ///
    /// Returns `false` and leaves the classification untouched if its location was
    /// already classified.
    pub fn insert(&mut self, record: PackageRecord, decision: &PackageDecision) -> bool {
        if !self.locations.insert(record.location.clone()) {
            return false;
        }
        match decision {
            PackageDecision::Download(_) => self.to_download.push(record),
            PackageDecision::Recycle => self.to_recycle.push(record),
            PackageDecision::Skip { .. } => self.skipped += 1,
        }
        true
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
