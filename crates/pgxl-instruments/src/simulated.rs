//! Simulated VNA for running RF suites without an instrument.
//!
//! The trace models the amplifier's output low-pass filter: a flat passband
//! up to the knee, then a roll-off of `base - 20·log10((f - knee + 1) / 1 MHz)`.

use async_trait::async_trait;

use pgxl_core::error::{Error, Result};

use crate::backend::{check_sweep, linear_axis, MeasurementBackend, Sweep, VnaVendor};

/// Low-pass response shape for one vendor profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPassProfile {
    /// Corner frequency in Hz.
    pub knee_hz: f64,
    /// Insertion loss reading below the knee (dB).
    pub passband_db: f64,
    /// Attenuation just past the knee (dB).
    pub stopband_base_db: f64,
}

impl LowPassProfile {
    pub fn for_vendor(vendor: VnaVendor) -> Self {
        match vendor {
            VnaVendor::Siglent => LowPassProfile {
                knee_hz: 60e6,
                passband_db: 0.1,
                stopband_base_db: -40.0,
            },
            VnaVendor::Rigol => LowPassProfile {
                knee_hz: 65e6,
                passband_db: 0.2,
                stopband_base_db: -35.0,
            },
        }
    }

    /// Modelled S21 at `freq_hz`.
    pub fn s21_db(&self, freq_hz: f64) -> f64 {
        if freq_hz <= self.knee_hz {
            self.passband_db
        } else {
            self.stopband_base_db - 20.0 * ((freq_hz - self.knee_hz + 1.0) / 1e6).log10()
        }
    }
}

/// A VNA that computes its traces.
#[derive(Debug, Clone)]
pub struct SimulatedVna {
    vendor: VnaVendor,
    profile: LowPassProfile,
    open: bool,
}

impl SimulatedVna {
    pub fn new(vendor: VnaVendor) -> Self {
        SimulatedVna {
            vendor,
            profile: LowPassProfile::for_vendor(vendor),
            open: true,
        }
    }

    pub fn profile(&self) -> LowPassProfile {
        self.profile
    }
}

#[async_trait]
impl MeasurementBackend for SimulatedVna {
    fn name(&self) -> &str {
        match self.vendor {
            VnaVendor::Siglent => "siglent (simulated)",
            VnaVendor::Rigol => "rigol (simulated)",
        }
    }

    async fn sweep(&mut self, start_hz: f64, stop_hz: f64, points: usize) -> Result<Sweep> {
        if !self.open {
            return Err(Error::NotConnected);
        }
        check_sweep(start_hz, stop_hz, points)?;
        let frequencies = linear_axis(start_hz, stop_hz, points);
        let values = frequencies.iter().map(|&f| self.profile.s21_db(f)).collect();
        tracing::debug!(vendor = %self.vendor, points, "simulated sweep");
        Ok(Sweep::new(frequencies, values))
    }

    async fn query(&mut self, scpi: &str) -> Result<String> {
        if !self.open {
            return Err(Error::NotConnected);
        }
        match scpi.trim().to_ascii_uppercase().as_str() {
            "*IDN?" => Ok(match self.vendor {
                VnaVendor::Siglent => "Siglent Technologies,SVA1032X,SIMULATED,1.0".to_string(),
                VnaVendor::Rigol => "Rigol Technologies,DSA875,SIMULATED,1.0".to_string(),
            }),
            "*OPC?" => Ok("1".to_string()),
            other => Err(Error::Protocol(format!(
                "simulated VNA does not answer {other}"
            ))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn siglent_lowpass_shape() {
        let mut vna = SimulatedVna::new(VnaVendor::Siglent);
        let sweep = vna.sweep(1e6, 150e6, 801).await.unwrap();
        assert_eq!(sweep.len(), 801);
        assert_eq!(sweep.frequencies[0], 1e6);
        assert_eq!(sweep.frequencies[800], 150e6);

        assert!(sweep.points().filter(|(f, _)| *f <= 60e6).all(|(_, v)| v == 0.1));
        assert!(sweep.points().filter(|(f, _)| *f >= 100e6).all(|(_, v)| v <= -35.0));
    }

    #[test]
    fn rigol_profile_rolls_off_later() {
        let rigol = LowPassProfile::for_vendor(VnaVendor::Rigol);
        assert_eq!(rigol.s21_db(64e6), 0.2);
        // One MHz past the knee: base - 20·log10(1.000001).
        assert!((rigol.s21_db(66e6) - -35.0).abs() < 1e-3);
        assert!(rigol.s21_db(120e6) < -60.0);
    }

    #[tokio::test]
    async fn identity_and_unknown_queries() {
        let mut vna = SimulatedVna::new(VnaVendor::Rigol);
        assert!(vna.query("*idn?").await.unwrap().starts_with("Rigol"));
        assert_eq!(vna.query("*OPC?").await.unwrap(), "1");
        assert!(vna.query(":SENS:FREQ:STAR?").await.is_err());
    }

    #[tokio::test]
    async fn closed_backend_refuses_work() {
        let mut vna = SimulatedVna::new(VnaVendor::Siglent);
        vna.close().await.unwrap();
        vna.close().await.unwrap();
        assert!(matches!(
            vna.sweep(1e6, 2e6, 3).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn invalid_sweep_rejected() {
        let mut vna = SimulatedVna::new(VnaVendor::Siglent);
        assert!(matches!(
            vna.sweep(2e6, 1e6, 10).await,
            Err(Error::InvalidParameter(_))
        ));
    }
}
