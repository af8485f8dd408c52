//! Error types for the registry crate.

use std::{io, sync::Arc};

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while decoding repository metadata.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Malformed metadata in {document}: {reason}")]
    #[diagnostic(
        code(reposync_registry::malformed_metadata),
        help("The remote metadata is not well-formed; the mirror may be mid-update")
    )]
    MalformedMetadata { document: String, reason: String },

    #[error("Failed to decompress {document}: {source}")]
    #[diagnostic(
        code(reposync_registry::decompression),
        help("The primary manifest is expected to be gzip-compressed")
    )]
    Decompression {
        document: String,
        #[source]
        source: io::Error,
    },

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(reposync_registry::io))]
    IoError {
        action: String,
        #[source]
        source: io::Error,
    },
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    pub(crate) fn malformed(document: &str, reason: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            document: document.to_string(),
            reason: reason.into(),
        }
    }
}

/// Recovers an owned `io::Error` from the shared one quick-xml hands out.
pub(crate) fn unshare_io(err: Arc<io::Error>) -> io::Error {
    Arc::try_unwrap(err).unwrap_or_else(|shared| io::Error::new(shared.kind(), shared.to_string()))
}
