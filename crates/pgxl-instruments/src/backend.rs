//! The measurement-backend contract used by the RF suites.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pgxl_core::error::{Error, Result};

/// One trace: `values[i]` was measured at `frequencies[i]` (Hz).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sweep {
    pub frequencies: Vec<f64>,
    pub values: Vec<f64>,
}

impl Sweep {
    /// Pair up an axis and a trace, dropping whichever tail is longer.
    pub fn new(mut frequencies: Vec<f64>, mut values: Vec<f64>) -> Self {
        let n = frequencies.len().min(values.len());
        frequencies.truncate(n);
        values.truncate(n);
        Sweep {
            frequencies,
            values,
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// `true` if the trace has no points.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// `(frequency, value)` pairs in sweep order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Value at the bin closest to `freq_hz`.
    pub fn value_near(&self, freq_hz: f64) -> Option<f64> {
        self.points()
            .min_by(|a, b| (a.0 - freq_hz).abs().total_cmp(&(b.0 - freq_hz).abs()))
            .map(|(_, value)| value)
    }
}

/// Evenly spaced frequency axis, both ends included.
///
/// A single point sits at the midpoint.
pub fn linear_axis(start_hz: f64, stop_hz: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![(start_hz + stop_hz) / 2.0],
        n => {
            let step = (stop_hz - start_hz) / (n - 1) as f64;
            (0..n).map(|i| start_hz + i as f64 * step).collect()
        }
    }
}

/// Reject sweeps the instruments cannot run.
pub(crate) fn check_sweep(start_hz: f64, stop_hz: f64, points: usize) -> Result<()> {
    if points < 2 {
        return Err(Error::InvalidParameter(format!(
            "a sweep needs at least 2 points, got {points}"
        )));
    }
    if !(start_hz.is_finite() && stop_hz.is_finite()) || start_hz <= 0.0 || stop_hz <= start_hz {
        return Err(Error::InvalidParameter(format!(
            "sweep range must satisfy 0 < start < stop, got {start_hz}..{stop_hz}"
        )));
    }
    Ok(())
}

/// A frequency-domain measurement instrument.
#[async_trait]
pub trait MeasurementBackend: Send {
    /// Short name for logs and artifacts.
    fn name(&self) -> &str;

    /// Measure `points` bins from `start_hz` to `stop_hz`; values in dB.
    async fn sweep(&mut self, start_hz: f64, stop_hz: f64, points: usize) -> Result<Sweep>;

    /// Send a raw SCPI query and return its answer line.
    async fn query(&mut self, scpi: &str) -> Result<String>;

    /// Release the instrument. Safe to call repeatedly.
    async fn close(&mut self) -> Result<()>;
}

/// Instrument family, selecting the simulation profile and SCPI dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VnaVendor {
    #[default]
    Siglent,
    Rigol,
}

impl fmt::Display for VnaVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VnaVendor::Siglent => "siglent",
            VnaVendor::Rigol => "rigol",
        })
    }
}

impl FromStr for VnaVendor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "siglent" => Ok(VnaVendor::Siglent),
            "rigol" => Ok(VnaVendor::Rigol),
            other => Err(Error::InvalidParameter(format!(
                "VNA vendor must be siglent or rigol, got {other:?}"
            ))),
        }
    }
}
