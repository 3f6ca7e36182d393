//! PgxlBuilder -- fluent builder for constructing [`PowerGeniusXl`] instances.
//!
//! # Example
//!
//! ```no_run
//! use pgxl_amp::PgxlBuilder;
//!
//! # async fn example() -> pgxl_core::Result<()> {
//! let mut amp = PgxlBuilder::new().host("192.168.1.50").build().await?;
//! amp.operate().await?;
//! let telemetry = amp.telemetry().await?;
//! println!("{:?}", telemetry.drain_current);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use pgxl_core::error::Result;
use pgxl_core::transport::Transport;
use pgxl_core::BandPlan;
use pgxl_line_io::{Dialect, LineLink, LinkConfig, Priming};

use crate::amp::PowerGeniusXl;

/// Default PGXL control port.
pub const DEFAULT_PORT: u16 = 9008;

/// How long to wait for the firmware banner after connecting.
const DEFAULT_BANNER_TIMEOUT: Duration = Duration::from_secs(2);

/// Default reply deadline.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Fluent builder for [`PowerGeniusXl`].
pub struct PgxlBuilder {
    host: Option<String>,
    port: u16,
    connect_timeout: Duration,
    command_timeout: Duration,
    banner_timeout: Duration,
    watched_fields: Vec<String>,
    band_plan: BandPlan,
}

impl PgxlBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        PgxlBuilder {
            host: None,
            port: DEFAULT_PORT,
            connect_timeout: pgxl_transport::DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            banner_timeout: DEFAULT_BANNER_TIMEOUT,
            watched_fields: Vec::new(),
            band_plan: BandPlan::default(),
        }
    }

    /// Amplifier IP address or hostname.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Control port (default: 9008).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// TCP connect timeout (default: 5 s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Reply deadline for each command (default: 5 s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Banner wait after connecting (default: 2 s).
    pub fn banner_timeout(mut self, timeout: Duration) -> Self {
        self.banner_timeout = timeout;
        self
    }

    /// Record the last pushed value of `key`, readable through
    /// [`PowerGeniusXl::cached_field`].
    pub fn watch_field(mut self, key: &str) -> Self {
        self.watched_fields.push(key.to_string());
        self
    }

    /// Bands [`PowerGeniusXl::set_band`] accepts (default: all eleven).
    pub fn band_plan(mut self, plan: BandPlan) -> Self {
        self.band_plan = plan;
        self
    }

    fn link_config(&self) -> LinkConfig {
        let mut config = LinkConfig::new(Dialect::pgxl());
        config.host = self.host.clone().unwrap_or_default();
        config.port = self.port;
        config.connect_timeout = self.connect_timeout;
        config.command_timeout = self.command_timeout;
        config.priming = Priming::Banner(self.banner_timeout);
        config.watched_fields = self.watched_fields.clone();
        config
    }

    /// Connect over TCP and read the banner.
    ///
    /// Requires that [`host()`](Self::host) has been called.
    pub async fn build(self) -> Result<PowerGeniusXl> {
        let mut link = LineLink::new(self.link_config());
        link.connect().await?;
        Ok(PowerGeniusXl::new(link, self.band_plan))
    }

    /// Run the session over an already-connected transport.
    ///
    /// The primary entry point for testing with a scripted transport.
    pub async fn build_with_transport(
        self,
        transport: Box<dyn Transport>,
    ) -> Result<PowerGeniusXl> {
        let mut link = LineLink::new(self.link_config());
        link.connect_with_transport(transport).await?;
        Ok(PowerGeniusXl::new(link, self.band_plan))
    }
}

impl Default for PgxlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
