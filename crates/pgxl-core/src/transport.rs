//! Transport trait for device links.
//!
//! The [`Transport`] trait abstracts over the byte stream to an amplifier,
//! radio or bench instrument. The production implementation is the TCP
//! transport in `pgxl-transport`; tests use the scripted transport from
//! `pgxl-test-harness`.
//!
//! The line framer and transaction engine in `pgxl-line-io` operate on a
//! boxed `Transport` rather than directly on a socket.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the device, returning once all bytes are written.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the device into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns
    /// [`Error::ReadTimeout`](crate::error::Error::ReadTimeout) if nothing
    /// arrived, and [`Error::ConnectionLost`](crate::error::Error::ConnectionLost)
    /// when the peer has closed the stream.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection. Calling this twice is not an error.
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
