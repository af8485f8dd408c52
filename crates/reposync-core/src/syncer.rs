use std::sync::Arc;

use reposync_dl::{Fetch, FetchStream};
use reposync_events::{EventSinkHandle, LogLevel, NullSink, PackageDecision, SyncEvent, SyncStage};
use reposync_registry::{decode_index, ManifestReader, PackageRecord, RepositoryIndex, REPOMD_PATH};
use reposync_store::ContentStore;
use tracing::{debug, trace};

use crate::{
    classify::{classify, ArchitectureFilter, Classification},
    error::{SyncError, SyncResult},
};

/// Optional files published next to the index. A 404 for either is not an error.
pub const SIGNATURE_PATHS: [&str; 2] = ["repodata/repomd.xml.asc", "repodata/repomd.xml.key"];

/// Outcome of one successful sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Packages fetched from the remote.
    pub downloaded: usize,
    /// Packages carried over from the previous generation.
    pub recycled: usize,
    /// Packages left out because their stored copy could not be checked.
    pub skipped: usize,
    /// Bytes fetched, metadata included.
    pub bytes: u64,
}

/// Mirrors one remote repository into a [`ContentStore`].
///
/// A sync runs these stages in order and stops at the first fatal error:
///
/// 1. fetch `repodata/repomd.xml`, storing and decoding it in one pass;
/// 2. fetch every file the index lists, in document order. The primary manifest is
///    decoded while it is stored and each package is classified as it is read;
/// 3. fetch the optional index signature and key;
/// 4. download new and changed packages;
/// 5. recycle unchanged packages;
/// 6. commit the new generation.
///
/// Until the commit succeeds the store keeps serving the previous generation.
pub struct Syncer<F, S> {
    repo_name: String,
    base_url: String,
    filter: ArchitectureFilter,
    fetcher: F,
    store: S,
    events: EventSinkHandle,
}

impl<F: Fetch, S: ContentStore> Syncer<F, S> {
    pub fn new(repo_name: impl Into<String>, base_url: &str, fetcher: F, store: S) -> Self {
        Self {
            repo_name: repo_name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            filter: ArchitectureFilter::accept_all(),
            fetcher,
            store,
            events: Arc::new(NullSink),
        }
    }

    pub fn with_filter(mut self, filter: ArchitectureFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_events(mut self, events: EventSinkHandle) -> Self {
        self.events = events;
        self
    }

    /// Remote URL of a repo-relative `path`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Runs a complete sync.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that failed, unchanged. The store is left
    /// uncommitted in that case.
    pub fn run(&mut self) -> SyncResult<SyncReport> {
        self.emit(SyncEvent::SyncStarting {
            repo_name: self.repo_name.clone(),
            url: self.base_url.clone(),
        });

        match self.sync() {
            Ok(report) => {
                self.emit(SyncEvent::SyncComplete {
                    repo_name: self.repo_name.clone(),
                    downloaded: report.downloaded,
                    recycled: report.recycled,
                    skipped: report.skipped,
                    bytes: report.bytes,
                });
                Ok(report)
            }
            Err(err) => {
                self.emit(SyncEvent::SyncFailed {
                    repo_name: self.repo_name.clone(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn sync(&mut self) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();
        let mut classification = Classification::default();

        self.stage(SyncStage::Metadata);
        let (index, bytes) = self.fetch_index()?;
        report.bytes += bytes;

        if index.primary().is_none() {
            self.log(
                LogLevel::Warning,
                format!("{REPOMD_PATH} lists no primary manifest, mirroring metadata only"),
            );
        }

        for entry in &index {
            report.bytes += if entry.is_primary() {
                self.fetch_manifest(&entry.location, &mut classification)?
            } else {
                self.fetch_file(&entry.location, "")?
            };
        }
        report.skipped = classification.skipped();

        self.stage(SyncStage::Signatures);
        for path in SIGNATURE_PATHS {
            report.bytes += self.fetch_optional(path)?;
        }

        let total = classification.to_download.len();
        self.stage(SyncStage::Downloading { total });
        for (done, record) in classification.to_download.iter().enumerate() {
            report.bytes += self.fetch_file(&record.location, &record.checksum)?;
            report.downloaded += 1;
            self.emit(SyncEvent::DownloadProgress {
                repo_name: self.repo_name.clone(),
                completed: done + 1,
                total,
            });
        }

        self.stage(SyncStage::Recycling {
            total: classification.to_recycle.len(),
        });
        for record in &classification.to_recycle {
            self.store.recycle(&record.location)?;
            report.recycled += 1;
        }

        self.stage(SyncStage::Committing);
        self.store.commit()?;

        debug!(
            repo = %self.repo_name,
            downloaded = report.downloaded,
            recycled = report.recycled,
            skipped = report.skipped,
            bytes = report.bytes,
            "sync complete"
        );
        Ok(report)
    }

    fn fetch_index(&mut self) -> SyncResult<(RepositoryIndex, u64)> {
        let mut stream = self.open(REPOMD_PATH, "")?;
        let index = decode_index(&mut stream)?;
        let bytes = self.finish(stream, REPOMD_PATH)?;
        Ok((index, bytes))
    }

    /// Stores the primary manifest at `path` and classifies its packages as they are
    /// decoded.
    fn fetch_manifest(&mut self, path: &str, classification: &mut Classification) -> SyncResult<u64> {
        let mut stream = self.open(path, "")?;
        for record in ManifestReader::new(&mut stream)? {
            self.admit(record?, classification);
        }
        self.finish(stream, path)
    }

    fn fetch_file(&mut self, path: &str, expected_checksum: &str) -> SyncResult<u64> {
        let stream = self.open(path, expected_checksum)?;
        self.finish(stream, path)
    }

    fn fetch_optional(&mut self, path: &str) -> SyncResult<u64> {
        match self.fetch_file(path, "") {
            Err(SyncError::Download(err)) if err.is_not_found() => {
                debug!(path, "optional file not published");
                self.emit(SyncEvent::OptionalMissing {
                    repo_name: self.repo_name.clone(),
                    path: path.to_string(),
                });
                Ok(0)
            }
            result => result,
        }
    }

    /// Starts fetching `path` with its bytes teed into the store.
    fn open(&mut self, path: &str, expected_checksum: &str) -> SyncResult<FetchStream> {
        let url = self.url_for(path);
        self.emit(SyncEvent::Fetching {
            repo_name: self.repo_name.clone(),
            path: path.to_string(),
        });
        debug!(url = %url, "fetching");

        let stream = self.fetcher.fetch(&url)?;
        let writer = self.store.writer(path, expected_checksum)?;
        Ok(stream.with_consumer(writer))
    }

    fn finish(&self, stream: FetchStream, path: &str) -> SyncResult<u64> {
        trace!(url = %stream.url(), "closing stream");
        let bytes = stream.close()?;
        self.emit(SyncEvent::Fetched {
            repo_name: self.repo_name.clone(),
            path: path.to_string(),
            bytes,
        });
        Ok(bytes)
    }

    fn admit(&self, record: PackageRecord, classification: &mut Classification) {
        if !self.filter.accepts(&record.arch) {
            trace!(location = %record.location, arch = %record.arch, "excluded by architecture filter");
            return;
        }

        if classification.contains(&record.location) {
            self.log(
                LogLevel::Warning,
                format!(
                    "{} is listed more than once, keeping the first entry",
                    record.location
                ),
            );
            return;
        }

        let decision = classify(&record, &self.store);
        if let PackageDecision::Skip { reason } = &decision {
            debug!(location = %record.location, "skipping: {reason}");
        }
        self.emit(SyncEvent::PackageClassified {
            repo_name: self.repo_name.clone(),
            location: record.location.clone(),
            decision: decision.clone(),
        });
        classification.insert(record, &decision);
    }

    fn stage(&self, stage: SyncStage) {
        self.emit(SyncEvent::Stage {
            repo_name: self.repo_name.clone(),
            stage,
        });
    }

    fn log(&self, level: LogLevel, message: String) {
        self.emit(SyncEvent::Log { level, message });
    }

    fn emit(&self, event: SyncEvent) {
        self.events.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use reposync_dl::DownloadError;
    use reposync_events::{CollectorSink, DownloadReason};
    use reposync_registry::RegistryError;
    use reposync_store::FileStore;
    use tempfile::tempdir;

    use super::*;
    use crate::test_utils::{
        gzip, repomd_xml, MemoryFetcher, Package, RemoteRepo, BASE_URL, FILELISTS_PATH,
        PRIMARY_PATH,
    };

    fn sync(root: &Path, fetcher: &MemoryFetcher) -> SyncResult<SyncReport> {
        let store = FileStore::open(root).unwrap();
        Syncer::new("base", BASE_URL, fetcher, store).run()
    }

    fn sync_with(
        root: &Path,
        fetcher: &MemoryFetcher,
        filter: ArchitectureFilter,
        sink: Arc<CollectorSink>,
    ) -> SyncResult<SyncReport> {
        let store = FileStore::open(root).unwrap();
        Syncer::new("base", BASE_URL, fetcher, store)
            .with_filter(filter)
            .with_events(sink)
            .run()
    }

    fn classified(sink: &CollectorSink) -> Vec<(String, PackageDecision)> {
        sink.events()
            .into_iter()
            .filter_map(|event| {
                match event {
                    SyncEvent::PackageClassified {
                        location,
                        decision,
                        ..
                    } => Some((location, decision)),
                    _ => None,
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_store_downloads_package() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let remote = RemoteRepo::new(&[Package::new("x86_64", "pkgs/a-1.0.rpm", b"package a")]);
        let fetcher = MemoryFetcher::new(&remote);
        let sink = Arc::new(CollectorSink::default());

        let report =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.recycled, 0);
        assert_eq!(report.skipped, 0);
        assert_eq!(
            classified(&sink),
            [(
                "pkgs/a-1.0.rpm".to_string(),
                PackageDecision::Download(DownloadReason::Missing)
            )]
        );

        assert_eq!(fs::read(root.join("pkgs/a-1.0.rpm")).unwrap(), b"package a");
        assert_eq!(
            fs::read(root.join(REPOMD_PATH)).unwrap(),
            remote.files[REPOMD_PATH]
        );
        assert_eq!(
            fs::read(root.join(PRIMARY_PATH)).unwrap(),
            remote.files[PRIMARY_PATH]
        );
        assert_eq!(
            fs::read(root.join(FILELISTS_PATH)).unwrap(),
            remote.files[FILELISTS_PATH]
        );
        assert!(root.join("repodata/repomd.xml.asc").exists());
        assert!(!root.join("repodata/repomd.xml.key").exists());
    }

    #[test]
    fn test_second_sync_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let remote = RemoteRepo::new(&[
            Package::new("x86_64", "pkgs/a-1.0.rpm", b"package a"),
            Package::new("noarch", "pkgs/b-2.0.rpm", b"package b"),
        ]);
        let fetcher = MemoryFetcher::new(&remote);

        let first = sync(&root, &fetcher).unwrap();
        assert_eq!(first.downloaded, 2);

        let second = sync(&root, &fetcher).unwrap();
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.recycled, 2);

        assert_eq!(fetcher.request_count("pkgs/a-1.0.rpm"), 1);
        assert_eq!(fetcher.request_count("pkgs/b-2.0.rpm"), 1);
        assert_eq!(fs::read(root.join("pkgs/b-2.0.rpm")).unwrap(), b"package b");
    }

    #[test]
    fn test_matching_package_is_recycled_without_fetch() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        fs::create_dir_all(root.join("pkgs")).unwrap();
        fs::write(root.join("pkgs/a-1.0.rpm"), b"package a").unwrap();

        let remote = RemoteRepo::new(&[Package::new("x86_64", "pkgs/a-1.0.rpm", b"package a")]);
        let fetcher = MemoryFetcher::new(&remote);
        let sink = Arc::new(CollectorSink::default());

        let report =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();

        assert_eq!(report.downloaded, 0);
        assert_eq!(report.recycled, 1);
        assert_eq!(fetcher.request_count("pkgs/a-1.0.rpm"), 0);
        assert_eq!(
            classified(&sink),
            [("pkgs/a-1.0.rpm".to_string(), PackageDecision::Recycle)]
        );
        assert_eq!(fs::read(root.join("pkgs/a-1.0.rpm")).unwrap(), b"package a");
    }

    #[test]
    fn test_checksum_mismatch_downloads() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let mut fetcher = MemoryFetcher::new(&RemoteRepo::new(&[Package::new(
            "x86_64",
            "pkgs/a-1.0.rpm",
            b"old build",
        )]));
        sync(&root, &fetcher).unwrap();

        fetcher.serve(&RemoteRepo::new(&[Package::new(
            "x86_64",
            "pkgs/a-1.0.rpm",
            b"new build",
        )]));
        let sink = Arc::new(CollectorSink::default());
        let report =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.recycled, 0);
        assert!(matches!(
            &classified(&sink)[0].1,
            PackageDecision::Download(DownloadReason::ChecksumMismatch { .. })
        ));
        assert_eq!(fs::read(root.join("pkgs/a-1.0.rpm")).unwrap(), b"new build");
    }

    #[test]
    fn test_unknown_algorithm_always_downloads() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let package =
            Package::new("x86_64", "pkgs/a-1.0.rpm", b"package a").with_checksum("md5", "abcdef");
        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[package]));

        sync(&root, &fetcher).unwrap();
        let report = sync(&root, &fetcher).unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.recycled, 0);
        assert_eq!(fetcher.request_count("pkgs/a-1.0.rpm"), 2);
    }

    #[test]
    fn test_sha1_checksum_is_recycled() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        // sha1("hello")
        let package = Package::new("x86_64", "pkgs/hello.rpm", b"hello")
            .with_checksum("sha", "AAF4C61DDCC5E8A2DABEDE0F3B482CD9AEA9434D");
        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[package]));

        sync(&root, &fetcher).unwrap();
        let report = sync(&root, &fetcher).unwrap();

        assert_eq!(report.recycled, 1);
        assert_eq!(report.downloaded, 0);
    }

    #[test]
    fn test_architecture_filter() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[
            Package::new("x86_64", "pkgs/a-1.0.x86_64.rpm", b"a"),
            Package::new("noarch", "pkgs/b-1.0.noarch.rpm", b"b"),
            Package::new("i386", "pkgs/c-1.0.i386.rpm", b"c"),
        ]));
        let sink = Arc::new(CollectorSink::default());

        let report = sync_with(
            &root,
            &fetcher,
            ArchitectureFilter::new(["x86_64"]),
            sink.clone(),
        )
        .unwrap();

        assert_eq!(report.downloaded, 2);
        assert!(root.join("pkgs/a-1.0.x86_64.rpm").exists());
        assert!(root.join("pkgs/b-1.0.noarch.rpm").exists());
        assert!(!root.join("pkgs/c-1.0.i386.rpm").exists());
        assert_eq!(fetcher.request_count("pkgs/c-1.0.i386.rpm"), 0);

        let locations: Vec<_> = classified(&sink).into_iter().map(|(l, _)| l).collect();
        assert_eq!(locations, ["pkgs/a-1.0.x86_64.rpm", "pkgs/b-1.0.noarch.rpm"]);
    }

    #[test]
    fn test_missing_signature_is_not_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let remote = RemoteRepo::new(&[Package::new("x86_64", "pkgs/a-1.0.rpm", b"a")])
            .without("repodata/repomd.xml.asc");
        let fetcher = MemoryFetcher::new(&remote);
        let sink = Arc::new(CollectorSink::default());

        let report =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();
        assert_eq!(report.downloaded, 1);

        let missing: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|event| {
                match event {
                    SyncEvent::OptionalMissing { path, .. } => Some(path),
                    _ => None,
                }
            })
            .collect();
        assert_eq!(missing, SIGNATURE_PATHS);
    }

    #[test]
    fn test_published_key_is_stored() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let remote = RemoteRepo::new(&[])
            .with_file("repodata/repomd.xml.key", b"-----BEGIN PGP PUBLIC KEY BLOCK-----\n");
        let fetcher = MemoryFetcher::new(&remote);

        sync(&root, &fetcher).unwrap();
        assert_eq!(
            fs::read(root.join("repodata/repomd.xml.key")).unwrap(),
            remote.files["repodata/repomd.xml.key"]
        );
    }

    #[test]
    fn test_signature_server_error_is_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let mut fetcher = MemoryFetcher::new(&RemoteRepo::new(&[Package::new(
            "x86_64",
            "pkgs/a-1.0.rpm",
            b"a",
        )]));
        fetcher.fail_with("repodata/repomd.xml.asc", 500);

        let err = sync(&root, &fetcher).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Download(DownloadError::HttpError { status: 500, .. })
        ));
        assert_eq!(fetcher.request_count("pkgs/a-1.0.rpm"), 0);
        assert!(!root.join(REPOMD_PATH).exists());
    }

    #[test]
    fn test_missing_index_is_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[]).without(REPOMD_PATH));
        let sink = Arc::new(CollectorSink::default());

        let err =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap_err();
        let SyncError::Download(err) = err else {
            panic!("expected a download error, got {err:?}");
        };
        assert!(err.is_not_found());
        assert_eq!(fetcher.requests().len(), 1);
        assert!(matches!(
            sink.events().last(),
            Some(SyncEvent::SyncFailed { .. })
        ));
    }

    #[test]
    fn test_failed_sync_keeps_previous_generation() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let mut fetcher =
            MemoryFetcher::new(&RemoteRepo::new(&[Package::new("x86_64", "pkgs/a-1.0.rpm", b"a")]));
        sync(&root, &fetcher).unwrap();

        let remote = RemoteRepo::new(&[
            Package::new("x86_64", "pkgs/a-1.0.rpm", b"a"),
            Package::new("x86_64", "pkgs/b-1.0.rpm", b"b"),
        ])
        .without("pkgs/b-1.0.rpm");
        fetcher.serve(&remote);

        let err = sync(&root, &fetcher).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Download(DownloadError::HttpError { status: 404, .. })
        ));

        assert_eq!(fs::read(root.join("pkgs/a-1.0.rpm")).unwrap(), b"a");
        assert!(!root.join("pkgs/b-1.0.rpm").exists());
        assert!(!dir.path().join("base.staging").exists());
    }

    #[test]
    fn test_unreferenced_packages_removed_on_commit() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let mut fetcher = MemoryFetcher::new(&RemoteRepo::new(&[
            Package::new("x86_64", "pkgs/a-1.0.rpm", b"a"),
            Package::new("x86_64", "pkgs/b-1.0.rpm", b"b"),
        ]));
        sync(&root, &fetcher).unwrap();

        fetcher.serve(&RemoteRepo::new(&[Package::new("x86_64", "pkgs/a-1.0.rpm", b"a")]));
        let report = sync(&root, &fetcher).unwrap();

        assert_eq!(report.recycled, 1);
        assert!(root.join("pkgs/a-1.0.rpm").exists());
        assert!(!root.join("pkgs/b-1.0.rpm").exists());
    }

    #[test]
    fn test_unsafe_location_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[
            Package::new("x86_64", "../escape.rpm", b"evil"),
            Package::new("x86_64", "pkgs/a-1.0.rpm", b"a"),
        ]));
        let sink = Arc::new(CollectorSink::default());

        let report =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.downloaded, 1);
        assert!(matches!(
            &classified(&sink)[0].1,
            PackageDecision::Skip { .. }
        ));
        assert!(!dir.path().join("escape.rpm").exists());
        assert_eq!(fetcher.request_count("../escape.rpm"), 0);
    }

    #[test]
    fn test_skipped_package_dropped_from_generation() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        // a directory where the package should be cannot be hashed
        fs::create_dir_all(root.join("pkgs/a-1.0.rpm")).unwrap();
        fs::write(root.join("pkgs/a-1.0.rpm/stray"), b"x").unwrap();

        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[
            Package::new("x86_64", "pkgs/a-1.0.rpm", b"package a"),
            Package::new("x86_64", "pkgs/b-1.0.rpm", b"package b"),
        ]));
        let sink = Arc::new(CollectorSink::default());

        let report =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.downloaded, 1);
        assert_eq!(report.recycled, 0);
        assert!(matches!(
            &classified(&sink)[0],
            (location, PackageDecision::Skip { .. }) if location == "pkgs/a-1.0.rpm"
        ));
        assert_eq!(fetcher.request_count("pkgs/a-1.0.rpm"), 0);
        assert!(!root.join("pkgs/a-1.0.rpm").exists());
        assert_eq!(fs::read(root.join("pkgs/b-1.0.rpm")).unwrap(), b"package b");
    }

    #[test]
    fn test_duplicate_location_classified_once() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[
            Package::new("x86_64", "pkgs/a-1.0.rpm", b"a"),
            Package::new("x86_64", "pkgs/a-1.0.rpm", b"a"),
        ]));
        let sink = Arc::new(CollectorSink::default());

        let report =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();

        assert_eq!(report.downloaded, 1);
        assert_eq!(classified(&sink).len(), 1);
        assert_eq!(fetcher.request_count("pkgs/a-1.0.rpm"), 1);
    }

    #[test]
    fn test_primary_not_gzip_is_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let remote = RemoteRepo::new(&[]).with_file(PRIMARY_PATH, b"<metadata/>");
        let fetcher = MemoryFetcher::new(&remote);

        let err = sync(&root, &fetcher).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Registry(RegistryError::Decompression { .. })
        ));
    }

    #[test]
    fn test_malformed_index_is_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let remote = RemoteRepo::new(&[]).with_file(REPOMD_PATH, b"<repomd><data type=\"primary\">");
        let fetcher = MemoryFetcher::new(&remote);

        let err = sync(&root, &fetcher).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Registry(RegistryError::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn test_index_without_primary_mirrors_metadata() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let remote = RemoteRepo::new(&[])
            .with_file(
                REPOMD_PATH,
                repomd_xml(&[("updateinfo", "repodata/updateinfo.xml.gz")]).as_bytes(),
            )
            .with_file("repodata/updateinfo.xml.gz", &gzip(b"<updates/>"));
        let fetcher = MemoryFetcher::new(&remote);
        let sink = Arc::new(CollectorSink::default());

        let report =
            sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();

        assert_eq!(report.downloaded, 0);
        assert!(root.join("repodata/updateinfo.xml.gz").exists());
        assert!(!root.join(PRIMARY_PATH).exists());
        assert!(sink.events().iter().any(|event| {
            matches!(
                event,
                SyncEvent::Log {
                    level: LogLevel::Warning,
                    ..
                }
            )
        }));
    }

    #[test]
    fn test_url_join() {
        let fetcher = MemoryFetcher::default();
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("base")).unwrap();
        let syncer = Syncer::new("base", "https://mirror.example.com/os///", &fetcher, store);

        assert_eq!(
            syncer.url_for("repodata/repomd.xml"),
            "https://mirror.example.com/os/repodata/repomd.xml"
        );
        assert_eq!(
            syncer.url_for("/pkgs/a.rpm"),
            "https://mirror.example.com/os/pkgs/a.rpm"
        );
    }

    #[test]
    fn test_trailing_slash_base_url() {
        let dir = tempdir().unwrap();
        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[]));
        let store = FileStore::open(dir.path().join("base")).unwrap();

        Syncer::new("base", &format!("{BASE_URL}/"), &fetcher, store)
            .run()
            .unwrap();

        assert!(fetcher.requests().iter().all(|url| !url[8..].contains("//")));
        assert_eq!(fetcher.request_count(REPOMD_PATH), 1);
    }

    #[test]
    fn test_events_in_stage_order() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("base");
        let fetcher = MemoryFetcher::new(&RemoteRepo::new(&[Package::new(
            "x86_64",
            "pkgs/a-1.0.rpm",
            b"a",
        )]));
        let sink = Arc::new(CollectorSink::default());

        sync_with(&root, &fetcher, ArchitectureFilter::accept_all(), sink.clone()).unwrap();

        let events = sink.events();
        assert!(matches!(events.first(), Some(SyncEvent::SyncStarting { .. })));
        assert!(matches!(
            events.last(),
            Some(SyncEvent::SyncComplete {
                downloaded: 1,
                recycled: 0,
                ..
            })
        ));

        let stages: Vec<_> = events
            .iter()
            .filter_map(|event| {
                match event {
                    SyncEvent::Stage { stage, .. } => Some(stage.clone()),
                    _ => None,
                }
            })
            .collect();
        assert_eq!(
            stages,
            [
                SyncStage::Metadata,
                SyncStage::Signatures,
                SyncStage::Downloading { total: 1 },
                SyncStage::Recycling { total: 0 },
                SyncStage::Committing,
            ]
        );
        assert!(events.iter().any(|event| {
            matches!(
                event,
                SyncEvent::DownloadProgress {
                    completed: 1,
                    total: 1,
                    ..
                }
            )
        }));
    }
}
