//! Buffered reader over a byte stream.
//!
//! Bytes read past a delimiter stay in the look-ahead buffer and are served
//! first on the next call, so a head read and the body read that follows
//! never lose data between them. Reads are issued in blocks, never one
//! byte at a time.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::wire::error::WireError;

const READ_BLOCK: usize = 8 * 1024;

#[derive(Debug)]
pub struct StreamReader<S> {
    inner: S,
    buf: BytesMut,
    /// Total bytes handed out, for truncation diagnostics.
    consumed: usize,
}

impl<S: AsyncRead + Unpin> StreamReader<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_BLOCK),
            consumed: 0,
        }
    }

    /// Read until `delimiter`, returning the bytes strictly before it.
    ///
    /// The delimiter itself is consumed. Fails with `TruncatedStream` if
    /// the stream ends first and with `HeadTooLarge` if more than `limit`
    /// bytes accumulate without a match.
    pub async fn read_until(&mut self, delimiter: &[u8], limit: usize) -> Result<Bytes, WireError> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = memchr::memmem::find(&self.buf[scanned..], delimiter) {
                let pos = scanned + pos;
                let line = self.buf.split_to(pos).freeze();
                let _ = self.buf.split_to(delimiter.len());
                self.consumed += pos + delimiter.len();
                return Ok(line);
            }
            if self.buf.len() > limit {
                return Err(WireError::HeadTooLarge { limit });
            }
            // A delimiter may straddle the boundary of the next block.
            scanned = self.buf.len().saturating_sub(delimiter.len() - 1);
            if self.fill().await? == 0 {
                return Err(self.truncated());
            }
        }
    }

    /// Read exactly `n` bytes, serving buffered bytes first.
    pub async fn read_exact(&mut self, n: usize) -> Result<Bytes, WireError> {
        while self.buf.len() < n {
            self.buf.reserve(n - self.buf.len());
            if self.fill().await? == 0 {
                return Err(self.truncated());
            }
        }
        self.consumed += n;
        Ok(self.buf.split_to(n).freeze())
    }

    /// Read until the peer closes, failing with `BodyTooLarge` past `limit`.
    pub async fn read_to_end(&mut self, limit: usize) -> Result<Bytes, WireError> {
        loop {
            if self.buf.len() > limit {
                return Err(WireError::BodyTooLarge { limit });
            }
            if self.fill().await? == 0 {
                break;
            }
        }
        self.consumed += self.buf.len();
        Ok(self.buf.split().freeze())
    }

    /// Wait until at least one byte is available.
    ///
    /// Returns `false` when the peer closed cleanly with nothing pending,
    /// which is how a keep-alive loop learns the client is done.
    pub async fn has_more(&mut self) -> Result<bool, WireError> {
        if !self.buf.is_empty() {
            return Ok(true);
        }
        Ok(self.fill().await? > 0)
    }

    /// Bytes read from the stream but not yet handed out.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Access the stream, e.g. to write a response on the same socket.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn fill(&mut self) -> Result<usize, WireError> {
        if self.buf.capacity() - self.buf.len() < READ_BLOCK / 4 {
            self.buf.reserve(READ_BLOCK);
        }
        Ok(self.inner.read_buf(&mut self.buf).await?)
    }

    fn truncated(&self) -> WireError {
        WireError::TruncatedStream {
            received: self.consumed + self.buf.len(),
        }
    }
}
