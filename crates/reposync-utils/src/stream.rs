//! Chunk consumers fed by a duplicating reader.

use std::io;

/// Receives every chunk of a byte stream as it is read.
///
/// Consumers are registered on a reader that forwards each chunk to all of them before
/// handing it to the caller. `finish` is called once the stream has been read to the
/// end; a consumer that is dropped without being finished must discard whatever it
/// produced.
pub trait StreamConsumer {
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    fn finish(self: Box<Self>) -> io::Result<()>;
}
