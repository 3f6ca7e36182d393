//! FlexRadioBuilder -- fluent builder for constructing [`FlexRadio`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! network parameters, the band plan and connect-time behaviour before
//! establishing the TCP connection to the radio.
//!
//! # Example
//!
//! ```no_run
//! use pgxl_flex::FlexRadioBuilder;
//!
//! # async fn example() -> pgxl_core::Result<()> {
//! let mut radio = FlexRadioBuilder::new()
//!     .host("192.168.1.100")
//!     .disable_band_persistence_on_connect(true)
//!     .build()
//!     .await?;
//! radio.set_band(20).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use pgxl_core::error::Result;
use pgxl_core::transport::Transport;
use pgxl_core::BandPlan;
use pgxl_line_io::{Dialect, LineLink, LinkConfig, Priming, Subscription};

use crate::codec;
use crate::radio::FlexRadio;

/// Default SmartSDR TCP command port.
pub const DEFAULT_PORT: u16 = 4992;

/// How long to absorb the radio's initial status dump.
const DEFAULT_DRAIN_WINDOW: Duration = Duration::from_millis(500);

/// Default command timeout.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(1500);

/// Fluent builder for [`FlexRadio`].
pub struct FlexRadioBuilder {
    host: Option<String>,
    port: u16,
    connect_timeout: Duration,
    command_timeout: Duration,
    drain_window: Duration,
    subscribe: bool,
    disable_band_persistence_on_connect: bool,
    band_plan: BandPlan,
}

impl FlexRadioBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        FlexRadioBuilder {
            host: None,
            port: DEFAULT_PORT,
            connect_timeout: pgxl_transport::DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            drain_window: DEFAULT_DRAIN_WINDOW,
            subscribe: true,
            disable_band_persistence_on_connect: false,
            band_plan: BandPlan::default(),
        }
    }

    /// Set the radio's IP address or hostname.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Set the SmartSDR TCP command port (default: 4992).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// TCP connect timeout (default: 5 s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the command response timeout (default: 1500 ms).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// How long to drain the initial status dump (default: 500 ms).
    pub fn drain_window(mut self, window: Duration) -> Self {
        self.drain_window = window;
        self
    }

    /// Send `sub radio all` after connecting (default: true).
    pub fn subscribe(mut self, enable: bool) -> Self {
        self.subscribe = enable;
        self
    }

    /// Turn band persistence off right after connecting, so band changes
    /// do not recall stored power settings (default: false).
    pub fn disable_band_persistence_on_connect(mut self, enable: bool) -> Self {
        self.disable_band_persistence_on_connect = enable;
        self
    }

    /// Band → center table for [`FlexRadio::set_band`].
    pub fn band_plan(mut self, plan: BandPlan) -> Self {
        self.band_plan = plan;
        self
    }

    fn link_config(&self) -> LinkConfig {
        let mut config = LinkConfig::new(Dialect::smartsdr());
        config.host = self.host.clone().unwrap_or_default();
        config.port = self.port;
        config.connect_timeout = self.connect_timeout;
        config.command_timeout = self.command_timeout;
        config.priming = Priming::Drain(self.drain_window);
        config.subscription = self.subscribe.then(|| Subscription {
            body: codec::CMD_SUBSCRIBE.to_string(),
            expect_reply: false,
        });
        config.watched_fields = vec![codec::FIELD_BAND_PERSISTENCE.to_string()];
        config
    }

    async fn finish(self, mut link: LineLink) -> Result<FlexRadio> {
        if self.disable_band_persistence_on_connect {
            link.send_best_effort(&codec::cmd_band_persistence(false), false)
                .await;
        }
        Ok(FlexRadio::new(link, self.band_plan))
    }

    /// Connect to the radio and build the [`FlexRadio`] instance.
    ///
    /// Requires that [`host()`](Self::host) has been called.
    pub async fn build(self) -> Result<FlexRadio> {
        let mut link = LineLink::new(self.link_config());
        link.connect().await?;
        self.finish(link).await
    }

    /// Build a [`FlexRadio`] over an already-connected transport.
    ///
    /// This is the primary entry point for testing.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<FlexRadio> {
        let mut link = LineLink::new(self.link_config());
        link.connect_with_transport(transport).await?;
        self.finish(link).await
    }
}

impl Default for FlexRadioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pgxl_core::error::Error;
    use pgxl_test_harness::{MockLineServer, ScriptedTransport};

    // -----------------------------------------------------------------------
    // Builder Defaults
    // -----------------------------------------------------------------------

    #[test]
    fn builder_defaults() {
        let builder = FlexRadioBuilder::new();
        assert_eq!(builder.port, 4992);
        assert_eq!(builder.command_timeout, Duration::from_millis(1500));
        assert_eq!(builder.drain_window, Duration::from_millis(500));
        assert!(builder.subscribe);
        assert!(!builder.disable_band_persistence_on_connect);
        assert!(builder.host.is_none());

        let config = builder.link_config();
        assert_eq!(config.dialect, Dialect::smartsdr());
        assert_eq!(config.priming, Priming::Drain(Duration::from_millis(500)));
        assert_eq!(
            config.subscription.map(|s| s.body).as_deref(),
            Some("sub radio all")
        );
        assert_eq!(config.watched_fields, vec!["band_persistence_enabled"]);
    }

    #[test]
    fn subscription_can_be_disabled() {
        let config = FlexRadioBuilder::new().subscribe(false).link_config();
        assert!(config.subscription.is_none());
    }

    #[tokio::test]
    async fn build_requires_host() {
        let err = FlexRadioBuilder::new().build().await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    // -----------------------------------------------------------------------
    // Connect-time behaviour
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn connect_sends_subscription_only() {
        let script = ScriptedTransport::new();
        script.push_line("V1.4.0.0");
        script.push_line("H2A3B4C5D");

        let radio = FlexRadioBuilder::new()
            .build_with_transport(Box::new(script.clone()))
            .await
            .unwrap();
        assert_eq!(radio.firmware_version(), Some("V1.4.0.0"));
        assert_eq!(script.sent_frames(), vec!["C1|sub radio all\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_can_disable_band_persistence() {
        let script = ScriptedTransport::new();

        FlexRadioBuilder::new()
            .disable_band_persistence_on_connect(true)
            .build_with_transport(Box::new(script.clone()))
            .await
            .unwrap();
        assert_eq!(
            script.sent_bodies(),
            vec!["sub radio all", "radio set band_persistence_enabled=0"]
        );
    }

    #[tokio::test]
    async fn build_over_tcp() {
        let mut server = MockLineServer::new().await.unwrap();
        server.greet("V1.4.0.0");
        server.greet("H2A3B4C5D");
        server.greet("S2A3B4C5D|radio slices=1 band_persistence_enabled=1");
        server.reply_to("slice s 0 mode=USB", "0|");
        let port = server.port();
        server.start();

        let mut radio = FlexRadioBuilder::new()
            .host("127.0.0.1")
            .port(port)
            .drain_window(Duration::from_millis(200))
            .build()
            .await
            .unwrap();
        assert_eq!(radio.cached_band_persistence(), Some(true));

        radio.set_mode_name("usb").await.unwrap();
        radio.disconnect().await;

        let received = server.wait().await.unwrap();
        assert_eq!(received, vec!["C1|sub radio all", "C2|slice s 0 mode=USB"]);
    }
}
