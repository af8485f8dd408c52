//! Fake remote repositories for sync tests.

use std::{
    cell::RefCell,
    collections::HashMap,
    io::{Cursor, Write},
};

use flate2::{write::GzEncoder, Compression};
use reposync_dl::{DownloadError, Fetch, FetchStream, Result as DownloadResult};
use sha2::{Digest, Sha256};

pub const BASE_URL: &str = "https://mirror.example.com/distro/os";
pub const PRIMARY_PATH: &str = "repodata/primary.xml.gz";
pub const FILELISTS_PATH: &str = "repodata/filelists.xml.gz";

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[derive(Debug, Clone)]
pub struct Package {
    pub arch: String,
    pub location: String,
    pub checksum_type: String,
    pub checksum: String,
    pub body: Vec<u8>,
}

impl Package {
    pub fn new(arch: &str, location: &str, body: &[u8]) -> Self {
        Self {
            arch: arch.to_string(),
            location: location.to_string(),
            checksum_type: "sha256".to_string(),
            checksum: sha256_hex(body),
            body: body.to_vec(),
        }
    }

    pub fn with_checksum(mut self, checksum_type: &str, checksum: &str) -> Self {
        self.checksum_type = checksum_type.to_string();
        self.checksum = checksum.to_string();
        self
    }
}

pub fn primary_xml(packages: &[Package]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<metadata \
         xmlns=\"http://linux.duke.edu/metadata/common\" \
         xmlns:rpm=\"http://linux.duke.edu/metadata/rpm\" packages=\"{}\">\n",
        packages.len()
    );
    for package in packages {
        xml.push_str(&format!(
            "<package type=\"rpm\">\n  <name>{name}</name>\n  <arch>{arch}</arch>\n  \
             <checksum type=\"{kind}\" pkgid=\"YES\">{sum}</checksum>\n  \
             <location href=\"{href}\"/>\n</package>\n",
            name = package.location.rsplit('/').next().unwrap_or_default(),
            arch = package.arch,
            kind = package.checksum_type,
            sum = package.checksum,
            href = package.location,
        ));
    }
    xml.push_str("</metadata>\n");
    xml
}

pub fn repomd_xml(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<repomd \
         xmlns=\"http://linux.duke.edu/metadata/repo\">\n  <revision>1700000000</revision>\n",
    );
    for (kind, location) in entries {
        xml.push_str(&format!(
            "  <data type=\"{kind}\">\n    <checksum type=\"sha256\">00</checksum>\n    \
             <location href=\"{location}\"/>\n  </data>\n"
        ));
    }
    xml.push_str("</repomd>\n");
    xml
}

/// The files a remote repository serves, keyed by repo-relative path.
#[derive(Debug, Clone, Default)]
pub struct RemoteRepo {
    pub files: HashMap<String, Vec<u8>>,
}

impl RemoteRepo {
    /// A repository with a primary manifest for `packages`, a filelists document and a
    /// detached index signature. There is no `repomd.xml.key`.
    pub fn new(packages: &[Package]) -> Self {
        let mut files = HashMap::new();
        files.insert(
            "repodata/repomd.xml".to_string(),
            repomd_xml(&[("primary", PRIMARY_PATH), ("filelists", FILELISTS_PATH)]).into_bytes(),
        );
        files.insert(
            PRIMARY_PATH.to_string(),
            gzip(primary_xml(packages).as_bytes()),
        );
        files.insert(
            FILELISTS_PATH.to_string(),
            gzip(b"<filelists packages=\"0\"/>"),
        );
        files.insert(
            "repodata/repomd.xml.asc".to_string(),
            b"-----BEGIN PGP SIGNATURE-----\n".to_vec(),
        );
        for package in packages {
            files.insert(package.location.clone(), package.body.clone());
        }
        Self { files }
    }

    pub fn with_file(mut self, path: &str, body: &[u8]) -> Self {
        self.files.insert(path.to_string(), body.to_vec());
        self
    }

    pub fn without(mut self, path: &str) -> Self {
        self.files.remove(path);
        self
    }
}

/// In-memory [`Fetch`] serving a [`RemoteRepo`] under [`BASE_URL`].
///
/// Unknown paths answer 404. Every requested URL is recorded.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    files: HashMap<String, Vec<u8>>,
    statuses: HashMap<String, u16>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new(repo: &RemoteRepo) -> Self {
        let mut fetcher = Self::default();
        fetcher.serve(repo);
        fetcher
    }

    /// Replaces the served repository, keeping the request log.
    pub fn serve(&mut self, repo: &RemoteRepo) {
        self.files = repo
            .files
            .iter()
            .map(|(path, body)| (format!("{BASE_URL}/{path}"), body.clone()))
            .collect();
    }

    /// Answers `status` for `path` instead of its content.
    pub fn fail_with(&mut self, path: &str, status: u16) {
        self.statuses.insert(format!("{BASE_URL}/{path}"), status);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        let url = format!("{BASE_URL}/{path}");
        self.requests.borrow().iter().filter(|r| **r == url).count()
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, url: &str) -> DownloadResult<FetchStream> {
        self.requests.borrow_mut().push(url.to_string());

        if let Some(status) = self.statuses.get(url) {
            return Err(DownloadError::HttpError {
                status: *status,
                url: url.to_string(),
            });
        }

        match self.files.get(url) {
            Some(body) => Ok(FetchStream::new(url, Box::new(Cursor::new(body.clone())))),
            None => {
                Err(DownloadError::HttpError {
                    status: 404,
                    url: url.to_string(),
                })
            }
        }
    }
}
