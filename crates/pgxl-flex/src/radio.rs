//! FlexRadio -- slice and transmit control of a SmartSDR radio.
//!
//! Mode and frequency changes wait for the radio's acknowledgement. Power,
//! tune and persistence settings are written fire-and-forget, matching how
//! SmartSDR clients drive the transmit chain. The band-persistence flag is
//! read from the state the radio pushes, never queried.

use pgxl_core::error::{Error, Result};
use pgxl_core::{clamp_percent, BandPlan};
use pgxl_line_io::{LineLink, SessionState};

use crate::codec;
use crate::mode::RadioMode;

/// A connected FlexRadio.
///
/// Constructed via [`FlexRadioBuilder`](crate::builder::FlexRadioBuilder).
pub struct FlexRadio {
    link: LineLink,
    band_plan: BandPlan,
}

impl FlexRadio {
    pub(crate) fn new(link: LineLink, band_plan: BandPlan) -> Self {
        FlexRadio { link, band_plan }
    }

    /// Set the slice 0 mode.
    pub async fn set_mode(&mut self, mode: RadioMode) -> Result<()> {
        tracing::info!(%mode, "flex: set mode");
        self.link.send_command(&codec::cmd_slice_mode(mode)).await?;
        Ok(())
    }

    /// Parse a mode name (any case) and set it.
    ///
    /// Unknown names fail with [`Error::InvalidParameter`] and nothing is
    /// sent.
    pub async fn set_mode_name(&mut self, name: &str) -> Result<RadioMode> {
        let mode: RadioMode = name.parse()?;
        self.set_mode(mode).await?;
        Ok(mode)
    }

    /// Tune slice 0.
    pub async fn set_frequency_mhz(&mut self, freq_mhz: f64) -> Result<()> {
        if !freq_mhz.is_finite() || freq_mhz <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "frequency must be a positive number of MHz, got {freq_mhz}"
            )));
        }
        tracing::info!(freq_mhz, "flex: tune");
        self.link
            .send_command(&codec::cmd_slice_tune(freq_mhz))
            .await?;
        Ok(())
    }

    /// Make slice 0 the TX slice and tune it to the band's center.
    ///
    /// Bands missing from the band plan fail with
    /// [`Error::UnsupportedBand`] and nothing is sent.
    pub async fn set_band(&mut self, meters: u16) -> Result<()> {
        let center = self.band_plan.resolve(meters)?;
        tracing::info!(meters, center, "flex: set band");
        self.link.send_command_no_wait(&codec::cmd_slice_tx()).await?;
        self.link
            .send_command(&codec::cmd_slice_tune(center))
            .await?;
        Ok(())
    }

    /// RF power in percent, clamped to 0..=100.
    pub async fn set_rf_power_percent(&mut self, percent: i32) -> Result<u8> {
        let percent = clamp_percent(percent);
        self.link
            .send_command_no_wait(&codec::cmd_rf_power(percent))
            .await?;
        Ok(percent)
    }

    /// Tune power in percent, clamped to 0..=100.
    pub async fn set_tune_power_percent(&mut self, percent: i32) -> Result<u8> {
        let percent = clamp_percent(percent);
        self.link
            .send_command_no_wait(&codec::cmd_tune_power(percent))
            .await?;
        Ok(percent)
    }

    /// Drive level: RF power and tune power set to the same clamped percent.
    pub async fn set_drive_percent(&mut self, percent: i32) -> Result<u8> {
        self.set_rf_power_percent(percent).await?;
        self.set_tune_power_percent(percent).await
    }

    /// Two-tone (`true`) or single-tone (`false`) tune source.
    pub async fn set_two_tone(&mut self, on: bool) -> Result<()> {
        self.link
            .send_command_no_wait(&codec::cmd_tune_mode(on))
            .await
    }

    /// Key the tune carrier.
    pub async fn key_carrier_on(&mut self) -> Result<()> {
        tracing::info!("flex: carrier on");
        self.link.send_command_no_wait(&codec::cmd_tune(true)).await
    }

    /// Unkey the tune carrier.
    pub async fn key_carrier_off(&mut self) -> Result<()> {
        tracing::info!("flex: carrier off");
        self.link.send_command_no_wait(&codec::cmd_tune(false)).await
    }

    /// Enable or disable per-band recall of radio settings.
    pub async fn set_band_persistence(&mut self, enabled: bool) -> Result<()> {
        self.link
            .send_command_no_wait(&codec::cmd_band_persistence(enabled))
            .await
    }

    /// Last pushed band-persistence flag; `None` while unknown.
    pub fn cached_band_persistence(&self) -> Option<bool> {
        self.link.cached().get_bool(codec::FIELD_BAND_PERSISTENCE)
    }

    /// Version line captured when the session opened.
    pub fn firmware_version(&self) -> Option<&str> {
        self.link.banner()
    }

    /// Band → center table used by [`set_band`](Self::set_band).
    pub fn band_plan(&self) -> &BandPlan {
        &self.band_plan
    }

    /// Session state.
    pub fn state(&self) -> SessionState {
        self.link.state()
    }

    /// Close the session. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        self.link.disconnect().await;
    }
}

impl std::fmt::Debug for FlexRadio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlexRadio")
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}
