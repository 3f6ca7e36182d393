//! TCP transport for device links.
//!
//! [`TcpTransport`] implements the [`Transport`] trait over a tokio
//! `TcpStream`. Both bench devices speak their counted line protocol over a
//! plain TCP socket:
//! - Power Genius XL amplifier (port 9008)
//! - FlexRadio SmartSDR command port (port 4992)
//! - SCPI-over-raw-socket instruments (port 5025)
//!
//! # Example
//!
//! ```no_run
//! use pgxl_transport::TcpTransport;
//! use pgxl_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> pgxl_core::Result<()> {
//! let mut transport = TcpTransport::connect("192.168.1.60", 9008).await?;
//! transport.send(b"C1|status\r\n").await?;
//!
//! let mut buf = [0u8; 4096];
//! let n = transport.receive(&mut buf, Duration::from_secs(2)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use pgxl_core::error::{Error, Result};
use pgxl_core::transport::Transport;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default write timeout (5 seconds).
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport for a single device session.
///
/// The connection is established eagerly via [`connect`](TcpTransport::connect)
/// or [`connect_with_timeout`](TcpTransport::connect_with_timeout). Read
/// timeouts are supplied per call by the line framer; the write timeout is
/// fixed per transport.
#[derive(Debug)]
pub struct TcpTransport {
    /// The underlying TCP stream, `None` after `close()` is called.
    stream: Option<TcpStream>,
    /// `host:port` label for logging.
    addr: String,
    write_timeout: Duration,
}

impl TcpTransport {
    /// Connect to `host:port` using the default connect timeout.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with_timeout(host, port, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to `host:port`, giving up after `timeout`.
    ///
    /// A refused connection maps to [`Error::Connection`]; an elapsed timeout
    /// maps to [`Error::ConnectTimeout`].
    pub async fn connect_with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = format!("{host}:{port}");
        tracing::debug!(
            addr = %addr,
            timeout_ms = timeout.as_millis(),
            "Connecting to TCP endpoint"
        );

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                tracing::error!(addr = %addr, "TCP connection timed out");
                Error::ConnectTimeout(timeout)
            })?
            .map_err(|e| {
                tracing::error!(addr = %addr, error = %e, "TCP connection failed");
                map_connect_error(e, &addr)
            })?;

        // Command frames are tiny and latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                addr = %addr,
                error = %e,
                "Failed to set TCP_NODELAY (continuing anyway)"
            );
        }

        tracing::info!(addr = %addr, "TCP connection established");

        Ok(Self {
            stream: Some(stream),
            addr,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        })
    }

    /// Wrap an already-connected `TcpStream`, e.g. one accepted in a test.
    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        tracing::debug!(addr = %addr, "Wrapping existing TCP stream");
        Self {
            stream: Some(stream),
            addr,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    /// Override the write timeout (default 5 s).
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// The `host:port` this transport was connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(addr = %self.addr, bytes = data.len(), "Sending data");

        let write = async {
            stream.write_all(data).await?;
            stream.flush().await
        };

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!(addr = %self.addr, error = %e, "Failed to send data");
                Err(map_io_error(e))
            }
            Err(_) => {
                tracing::error!(
                    addr = %self.addr,
                    timeout_ms = self.write_timeout.as_millis(),
                    "Write timed out"
                );
                Err(Error::ConnectionLost)
            }
        }
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, stream.read(buf)).await {
            Ok(Ok(0)) => {
                tracing::warn!(addr = %self.addr, "Peer closed connection (0 bytes read)");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(addr = %self.addr, bytes = n, "Received data");
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(addr = %self.addr, error = %e, "Failed to receive data");
                Err(map_io_error(e))
            }
            Err(_) => Err(Error::ReadTimeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!(addr = %self.addr, "Closing TCP connection");

            if let Err(e) = stream.shutdown().await {
                tracing::warn!(
                    addr = %self.addr,
                    error = %e,
                    "Failed to shutdown TCP stream (continuing anyway)"
                );
            }

            tracing::info!(addr = %self.addr, "TCP connection closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Map a connection-time I/O error to the appropriate [`Error`] variant.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            Error::Connection(format!("connection refused: {addr}"))
        }
        _ => Error::Connection(format!("{addr}: {e}")),
    }
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::UnexpectedEof => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
