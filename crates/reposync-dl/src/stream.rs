use std::io::{self, Read};

use reposync_utils::stream::StreamConsumer;
use tracing::trace;

use crate::error::{DownloadError, Result};

/// A response body that duplicates every chunk it yields.
///
/// Each chunk read from the underlying body is handed to every registered
/// [`StreamConsumer`], in registration order, before it is returned to the caller. A
/// decoder can therefore read the stream while a store writer persists the same bytes.
///
/// The stream must be finalized with [`FetchStream::close`]. Dropping it instead drops
/// the consumers unfinished, which discards whatever they wrote.
pub struct FetchStream {
    url: String,
    inner: Box<dyn Read>,
    consumers: Vec<Box<dyn StreamConsumer>>,
    bytes_read: u64,
}

impl FetchStream {
    pub fn new(url: impl Into<String>, inner: Box<dyn Read>) -> Self {
        Self {
            url: url.into(),
            inner,
            consumers: Vec::new(),
            bytes_read: 0,
        }
    }

    /// Registers a consumer. Chunks already read are not replayed to it.
    pub fn with_consumer(mut self, consumer: Box<dyn StreamConsumer>) -> Self {
        self.consumers.push(consumer);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reads the remainder of the body, finishes every consumer and releases the
    /// connection.
    ///
    /// Returns the total number of bytes that went through the stream.
    pub fn close(mut self) -> Result<u64> {
        io::copy(&mut self, &mut io::sink()).map_err(|source| {
            DownloadError::Io {
                url: self.url.clone(),
                source,
            }
        })?;

        let consumers = std::mem::take(&mut self.consumers);
        for consumer in consumers {
            consumer.finish().map_err(|source| {
                DownloadError::Io {
                    url: self.url.clone(),
                    source,
                }
            })?;
        }

        trace!(url = %self.url, bytes = self.bytes_read, "stream closed");
        Ok(self.bytes_read)
    }
}

impl Read for FetchStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            let chunk = &buf[..n];
            for consumer in self.consumers.iter_mut() {
                consumer.on_chunk(chunk)?;
            }
            self.bytes_read += n as u64;
        }
        Ok(n)
    }
}

impl std::fmt::Debug for FetchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchStream")
            .field("url", &self.url)
            .field("consumers", &self.consumers.len())
            .field("bytes_read", &self.bytes_read)
            .finish()
    }
}
