use reposync_utils::{hash::ChecksumType, stream::StreamConsumer};

use crate::error::Result;

/// Durable storage for one mirrored repository, keyed by repo-relative path.
///
/// A store builds a new generation while the previous one stays readable. Files are
/// added to the new generation either by writing them through [`ContentStore::writer`]
/// or by carrying them over with [`ContentStore::recycle`]. Nothing becomes visible to
/// [`ContentStore::checksum`] until [`ContentStore::commit`] succeeds, and anything the
/// new generation does not reference disappears at that point.
pub trait ContentStore {
    /// Returns a consumer that persists every chunk it receives under `path`.
    ///
    /// The file only joins the generation once the consumer is finished. A consumer
    /// dropped without being finished leaves nothing behind. `expected_checksum` is
    /// advisory and may be empty.
    fn writer(&mut self, path: &str, expected_checksum: &str)
        -> Result<Box<dyn StreamConsumer>>;

    /// Checksum of the committed copy of `path`, as lowercase hex.
    ///
    /// Fails with [`StoreError::FileNotFound`](crate::StoreError::FileNotFound) when no
    /// file exists at `path`, and with
    /// [`StoreError::Checksum`](crate::StoreError::Checksum) when it cannot be hashed.
    fn checksum(&self, path: &str, algorithm: ChecksumType) -> Result<String>;

    /// Keeps the committed copy of `path` in the generation being built.
    fn recycle(&mut self, path: &str) -> Result<()>;

    /// Promotes the generation being built and discards the previous one.
    fn commit(&mut self) -> Result<()>;
}

impl<T: ContentStore + ?Sized> ContentStore for &mut T {
    fn writer(
        &mut self,
        path: &str,
        expected_checksum: &str,
    ) -> Result<Box<dyn StreamConsumer>> {
        (**self).writer(path, expected_checksum)
    }

    fn checksum(&self, path: &str, algorithm: ChecksumType) -> Result<String> {
        (**self).checksum(path, algorithm)
    }

    fn recycle(&mut self, path: &str) -> Result<()> {
        (**self).recycle(path)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }
}
