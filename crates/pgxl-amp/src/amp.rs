//! PowerGeniusXl -- typed control of a Power Genius XL amplifier.
//!
//! Every method is one acknowledged transaction on the amplifier's counted
//! line protocol. A reply with a non-zero status surfaces as
//! [`Error::Rejected`]; nothing is retried.

use std::collections::BTreeMap;

use pgxl_core::error::{Error, Result};
use pgxl_core::{Band, BandPlan};
use pgxl_line_io::{LineLink, SessionState};

use crate::codec::{self, BiasMode};
use crate::telemetry::Telemetry;

/// A connected PGXL amplifier.
///
/// Constructed via [`PgxlBuilder`](crate::builder::PgxlBuilder).
pub struct PowerGeniusXl {
    link: LineLink,
    band_plan: BandPlan,
}

impl PowerGeniusXl {
    pub(crate) fn new(link: LineLink, band_plan: BandPlan) -> Self {
        PowerGeniusXl { link, band_plan }
    }

    /// Switch between OPERATE (`true`) and STANDBY (`false`).
    pub async fn set_operate_mode(&mut self, on: bool) -> Result<()> {
        tracing::info!(on, "pgxl: set operate mode");
        self.link.send_command(&codec::cmd_operate(on)).await?;
        Ok(())
    }

    /// Shorthand for `set_operate_mode(true)`.
    pub async fn operate(&mut self) -> Result<()> {
        self.set_operate_mode(true).await
    }

    /// Shorthand for `set_operate_mode(false)`.
    pub async fn standby(&mut self) -> Result<()> {
        self.set_operate_mode(false).await
    }

    /// Set the PA bias class on both radio inputs.
    pub async fn set_bias_mode(&mut self, mode: BiasMode) -> Result<()> {
        tracing::info!(%mode, "pgxl: set bias");
        self.link.send_command(&codec::cmd_bias(mode)).await?;
        Ok(())
    }

    /// Select a band by wavelength in metres.
    ///
    /// Bands missing from the band plan fail with
    /// [`Error::UnsupportedBand`] and nothing is sent.
    pub async fn set_band(&mut self, meters: u16) -> Result<()> {
        self.band_plan.resolve(meters)?;
        let band = Band::from_meters(meters).ok_or(Error::UnsupportedBand(meters))?;
        tracing::info!(%band, "pgxl: set band");
        self.link.send_command(&codec::cmd_band(band)).await?;
        Ok(())
    }

    /// Read a telemetry snapshot.
    pub async fn telemetry(&mut self) -> Result<Telemetry> {
        let reply = self.link.send_command(codec::CMD_STATUS).await?;
        Ok(reply.into())
    }

    /// Identity and configuration fields, unparsed.
    pub async fn info(&mut self) -> Result<BTreeMap<String, String>> {
        Ok(self.link.send_command(codec::CMD_INFO).await?.fields)
    }

    /// Banner captured when the session opened, usually the firmware version.
    pub fn firmware_version(&self) -> Option<&str> {
        self.link.banner()
    }

    /// Last pushed value of a watched field; `None` while unknown.
    pub fn cached_field(&self, key: &str) -> Option<&str> {
        self.link.cached().get(key)
    }

    /// Bands this amplifier accepts, lowest frequency first.
    pub fn band_plan(&self) -> &BandPlan {
        &self.band_plan
    }

    /// Session state.
    pub fn state(&self) -> SessionState {
        self.link.state()
    }

    /// Re-open the TCP session after a drop. The sequence counter restarts.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.link.connect().await
    }

    /// Close the session. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        self.link.disconnect().await;
    }
}

impl std::fmt::Debug for PowerGeniusXl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerGeniusXl")
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}
