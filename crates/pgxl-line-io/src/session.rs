//! Session lifecycle: connect, prime, subscribe, disconnect.
//!
//! ```text
//! Disconnected --connect--> Connecting --socket up--> Priming --> Ready
//!      ^                        |                        |          |
//!      +-------- error ---------+-------- error ---------+--close---+
//! ```
//!
//! Priming absorbs whatever the device pushes right after accept (the
//! amplifier's firmware banner, the radio's version line and state dump)
//! before any caller transaction is issued. Every primed line goes through
//! the state scanner, so pushed values are known from the start.

use std::time::Duration;

use tokio::time::Instant;

use pgxl_core::error::{Error, Result};
use pgxl_core::transport::Transport;
use pgxl_transport::TcpTransport;

use crate::engine::{LineLink, POLL_INTERVAL};
use crate::protocol::Dialect;

/// Observable connection state of a [`LineLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket.
    Disconnected,
    /// TCP connect in progress.
    Connecting,
    /// Socket open; absorbing the initial unsolicited burst.
    Priming,
    /// Accepting caller transactions.
    Ready,
}

/// How the session absorbs the device's initial burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priming {
    /// Go straight to `Ready`.
    None,
    /// Wait up to the given time for a single banner line.
    ///
    /// A missing banner is not an error; the banner is simply unknown.
    Banner(Duration),
    /// Drain every line that arrives within the given window.
    Drain(Duration),
}

/// A command sent once after priming to request push updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Command body, e.g. `sub radio all`.
    pub body: String,
    /// Whether to wait for an acknowledgement.
    pub expect_reply: bool,
}

/// Everything a [`LineLink`] needs to open and run a session.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Framing parameters.
    pub dialect: Dialect,
    /// Device host name or address.
    pub host: String,
    /// Device TCP port.
    pub port: u16,
    /// Limit on the TCP connect.
    pub connect_timeout: Duration,
    /// Default reply deadline for acknowledged commands.
    pub command_timeout: Duration,
    /// Initial-burst handling.
    pub priming: Priming,
    /// Optional best-effort subscription.
    pub subscription: Option<Subscription>,
    /// Field names the state scanner records.
    pub watched_fields: Vec<String>,
}

impl LinkConfig {
    /// Defaults for `dialect` with no host set.
    pub fn new(dialect: Dialect) -> Self {
        LinkConfig {
            dialect,
            host: String::new(),
            port: 0,
            connect_timeout: pgxl_transport::DEFAULT_CONNECT_TIMEOUT,
            command_timeout: Duration::from_millis(1500),
            priming: Priming::None,
            subscription: None,
            watched_fields: Vec::new(),
        }
    }
}

impl LineLink {
    /// Open a TCP session to the configured host and port, then prime.
    ///
    /// Any existing session is closed first, and the sequence counter
    /// restarts. On failure the link is left `Disconnected`.
    pub async fn connect(&mut self) -> Result<()> {
        if self.config.host.is_empty() {
            return Err(Error::InvalidParameter(
                "host is required for a TCP session".into(),
            ));
        }
        self.disconnect().await;
        self.state = SessionState::Connecting;
        tracing::info!(
            dialect = self.config.dialect.name,
            host = %self.config.host,
            port = self.config.port,
            "connecting"
        );

        let transport = match TcpTransport::connect_with_timeout(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout,
        )
        .await
        {
            Ok(transport) => transport,
            Err(e) => {
                self.state = SessionState::Disconnected;
                return Err(e);
            }
        };

        self.establish(Box::new(transport)).await
    }

    /// Run a session over an already-connected transport, then prime.
    ///
    /// This is how tests attach a scripted transport.
    pub async fn connect_with_transport(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        self.disconnect().await;
        self.state = SessionState::Connecting;
        self.establish(transport).await
    }

    async fn establish(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        self.transport = Some(transport);
        self.seq = 0;
        self.framer.clear();
        self.cache.reset();
        self.banner = None;

        self.state = SessionState::Priming;
        if let Err(e) = self.prime().await {
            tracing::error!(dialect = self.config.dialect.name, error = %e, "priming failed");
            self.disconnect().await;
            return Err(e);
        }

        if let Some(sub) = self.config.subscription.clone() {
            self.send_best_effort(&sub.body, sub.expect_reply).await;
            if self.transport.is_none() {
                return Err(Error::ConnectionLost);
            }
        }

        self.state = SessionState::Ready;
        tracing::info!(
            dialect = self.config.dialect.name,
            banner = self.banner.as_deref().unwrap_or("<none>"),
            "session ready"
        );
        Ok(())
    }

    async fn prime(&mut self) -> Result<()> {
        let (window, single_line) = match self.config.priming {
            Priming::None => return Ok(()),
            Priming::Banner(timeout) => (timeout, true),
            Priming::Drain(window) => (window, false),
        };
        let deadline = Instant::now() + window;
        let mut drained = 0usize;

        loop {
            while let Some(line) = self.framer.next_line() {
                drained += 1;
                self.cache.scan(&line);
                if self.banner.is_none() {
                    self.banner = Some(line);
                    if single_line {
                        tracing::debug!(drained, "banner received");
                        return Ok(());
                    }
                }
            }
            if self.framer.is_peer_closed() {
                return Err(Error::ConnectionLost);
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(drained, "priming window elapsed");
                return Ok(());
            }
            let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
            self.framer
                .fill(transport.as_mut(), (deadline - now).min(POLL_INTERVAL))
                .await?;
        }
    }

    /// Close the session. Safe to call at any time, any number of times.
    ///
    /// Clears the receive buffer, the cached state and the banner.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                tracing::warn!(dialect = self.config.dialect.name, error = %e, "error closing transport");
            }
            tracing::info!(dialect = self.config.dialect.name, "disconnected");
        }
        self.framer.clear();
        self.cache.reset();
        self.banner = None;
        self.state = SessionState::Disconnected;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `true` when caller transactions are accepted.
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// First line received while priming, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }
}
