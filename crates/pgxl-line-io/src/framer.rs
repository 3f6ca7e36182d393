//! Incremental byte-stream to line decoder.
//!
//! [`LineFramer`] accumulates whatever the transport delivers and hands out
//! complete `\n`-terminated lines, trimmed of surrounding whitespace (which
//! also strips the `\r` of CRLF dialects). A trailing partial line stays
//! buffered until the rest of it arrives.
//!
//! The buffer is connection-scoped: the session clears it on connect and on
//! disconnect.

use std::time::Duration;

use bytes::{Buf, BytesMut};

use pgxl_core::error::{Error, Result};
use pgxl_core::transport::Transport;

/// Upper bound on buffered bytes without a line terminator.
pub const MAX_BUFFER: usize = 64 * 1024;

/// Size of a single transport read.
const READ_CHUNK: usize = 4096;

/// Line decoder over a streaming transport.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
    peer_closed: bool,
}

impl LineFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes to the buffer.
    ///
    /// Fails with [`Error::Protocol`] (and drops the buffered bytes) if the
    /// buffer would exceed [`MAX_BUFFER`] without containing a terminator.
    pub fn push_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);
        if self.buf.len() > MAX_BUFFER && !self.buf.contains(&b'\n') {
            let len = self.buf.len();
            self.buf.clear();
            return Err(Error::Protocol(format!(
                "{len} bytes received without a line terminator"
            )));
        }
        Ok(())
    }

    /// Pop the next complete, non-empty line from the buffer.
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw = self.buf.split_to(pos);
            self.buf.advance(1);
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }

    /// Iterate over the complete lines currently buffered.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { framer: self }
    }

    /// Perform one timed read from `transport` into the buffer.
    ///
    /// Returns the number of bytes read. A read timeout is not an error and
    /// returns 0. A closed peer also returns 0 and latches
    /// [`is_peer_closed`](Self::is_peer_closed); the caller decides what that
    /// means for the session.
    pub async fn fill(&mut self, transport: &mut dyn Transport, timeout: Duration) -> Result<usize> {
        if self.peer_closed {
            return Ok(0);
        }
        let mut chunk = [0u8; READ_CHUNK];
        match transport.receive(&mut chunk, timeout).await {
            Ok(n) => {
                self.push_bytes(&chunk[..n])?;
                Ok(n)
            }
            Err(Error::ReadTimeout) => Ok(0),
            Err(Error::ConnectionLost) => {
                tracing::debug!("peer closed the stream");
                self.peer_closed = true;
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Read once and return the complete lines now available.
    ///
    /// Timeouts and peer closure yield an empty sequence.
    pub async fn feed(
        &mut self,
        transport: &mut dyn Transport,
        timeout: Duration,
    ) -> Result<Lines<'_>> {
        self.fill(transport, timeout).await?;
        Ok(self.lines())
    }

    /// `true` once a read has observed the peer closing the stream.
    pub fn is_peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Number of bytes buffered but not yet returned as lines.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop buffered bytes and forget any observed closure.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.peer_closed = false;
    }
}

/// Lines drained from a [`LineFramer`], yielded one at a time.
///
/// Lines not consumed before the iterator is dropped stay buffered.
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.framer.next_line()
    }
}
