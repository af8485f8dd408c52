//! rpm-md metadata decoding for reposync.
//!
//! Two documents are understood:
//! - **Repository index** (`repodata/repomd.xml`): the list of metadata files a
//!   repository publishes, each tagged with a type.
//! - **Primary manifest** (referenced by the `primary` index entry): a gzip-compressed
//!   list of packages with their architecture, location and checksum.
//!
//! Both decoders read from any [`std::io::Read`], so they can consume a network stream
//! directly while its bytes are persisted elsewhere.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//!
//! use reposync_registry::{decode_index, ManifestReader};
//!
//! fn list_packages() -> reposync_registry::Result<()> {
//!     let index = decode_index(File::open("repodata/repomd.xml").unwrap())?;
//!     if let Some(primary) = index.primary() {
//!         for record in ManifestReader::new(File::open(&primary.location).unwrap())? {
//!             println!("{}", record?.location);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod primary;
pub mod repomd;
mod xml;

pub use error::{RegistryError, Result};
pub use primary::{
    decode_manifest, ChecksumType, ManifestReader, PackageManifest, PackageRecord,
    GZIP_MAGIC_BYTES,
};
pub use repomd::{decode_index, MetadataEntry, RepositoryIndex, PRIMARY_TYPE, REPOMD_PATH};
