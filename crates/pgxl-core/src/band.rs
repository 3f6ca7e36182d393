//! Amateur HF band identification and the band-center plan.
//!
//! Bench procedures address bands by wavelength in metres ("20", "160m").
//! [`Band`] covers the HF and 6 m bands the PGXL amplifies, and [`BandPlan`]
//! maps each band to the center frequency the exciter is tuned to when a
//! suite steps through bands.
//!
//! # Example
//!
//! ```
//! use pgxl_core::{Band, BandPlan};
//!
//! let band: Band = "20m".parse().unwrap();
//! assert_eq!(band.meters(), 20);
//!
//! let plan = BandPlan::default();
//! assert_eq!(plan.resolve(20).unwrap(), 14.175);
//! assert!(plan.resolve(2).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Amateur band covered by the PGXL, lowest frequency first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    /// 160 meters (1.8–2.0 MHz).
    Band160m,
    /// 80 meters (3.5–4.0 MHz).
    Band80m,
    /// 60 meters (channelised around 5.3–5.4 MHz).
    Band60m,
    /// 40 meters (7.0–7.3 MHz).
    Band40m,
    /// 30 meters (10.1–10.15 MHz).
    Band30m,
    /// 20 meters (14.0–14.35 MHz).
    Band20m,
    /// 17 meters (18.068–18.168 MHz).
    Band17m,
    /// 15 meters (21.0–21.45 MHz).
    Band15m,
    /// 12 meters (24.89–24.99 MHz).
    Band12m,
    /// 10 meters (28.0–29.7 MHz).
    Band10m,
    /// 6 meters (50.0–54.0 MHz).
    Band6m,
}

const ALL_BANDS: &[Band] = &[
    Band::Band160m,
    Band::Band80m,
    Band::Band60m,
    Band::Band40m,
    Band::Band30m,
    Band::Band20m,
    Band::Band17m,
    Band::Band15m,
    Band::Band12m,
    Band::Band10m,
    Band::Band6m,
];

impl Band {
    /// Returns the band for a wavelength in metres, if the PGXL covers it.
    pub fn from_meters(meters: u16) -> Option<Band> {
        ALL_BANDS.iter().copied().find(|b| b.meters() == meters)
    }

    /// Wavelength designation in metres (e.g. 20 for 20 m).
    pub fn meters(&self) -> u16 {
        match self {
            Band::Band160m => 160,
            Band::Band80m => 80,
            Band::Band60m => 60,
            Band::Band40m => 40,
            Band::Band30m => 30,
            Band::Band20m => 20,
            Band::Band17m => 17,
            Band::Band15m => 15,
            Band::Band12m => 12,
            Band::Band10m => 10,
            Band::Band6m => 6,
        }
    }

    /// Returns a slice of all bands in frequency order (lowest first).
    pub fn all() -> &'static [Band] {
        ALL_BANDS
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.meters())
    }
}

/// Error returned when a string cannot be parsed into a [`Band`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBandError(String);

impl fmt::Display for ParseBandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown band: '{}'", self.0)
    }
}

impl std::error::Error for ParseBandError {}

impl FromStr for Band {
    type Err = ParseBandError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let digits = trimmed.strip_suffix('m').unwrap_or(&trimmed);
        digits
            .parse::<u16>()
            .ok()
            .and_then(Band::from_meters)
            .ok_or_else(|| ParseBandError(s.to_string()))
    }
}

/// Band → center frequency table (MHz) used when stepping the exciter.
///
/// The table is configuration rather than a constant: 60 m in particular is
/// channelised differently by region, so callers may override or remove
/// entries. Lookups for bands without an entry fail with
/// [`Error::UnsupportedBand`].
#[derive(Debug, Clone, PartialEq)]
pub struct BandPlan {
    centers: BTreeMap<Band, f64>,
}

impl BandPlan {
    /// An empty plan; every lookup fails until entries are added.
    pub fn empty() -> Self {
        BandPlan {
            centers: BTreeMap::new(),
        }
    }

    /// Set (or replace) the center frequency for a band.
    pub fn set_center(&mut self, band: Band, center_mhz: f64) -> Result<()> {
        if !center_mhz.is_finite() || center_mhz <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "center frequency for {band} must be positive, got {center_mhz}"
            )));
        }
        self.centers.insert(band, center_mhz);
        Ok(())
    }

    /// Builder-style variant of [`set_center`](Self::set_center).
    pub fn with_center(mut self, band: Band, center_mhz: f64) -> Result<Self> {
        self.set_center(band, center_mhz)?;
        Ok(self)
    }

    /// Remove a band from the plan.
    pub fn remove(&mut self, band: Band) -> Option<f64> {
        self.centers.remove(&band)
    }

    /// Center frequency for a band, if the plan lists it.
    pub fn center_mhz(&self, band: Band) -> Option<f64> {
        self.centers.get(&band).copied()
    }

    /// Resolve a wavelength in metres to its center frequency in MHz.
    pub fn resolve(&self, meters: u16) -> Result<f64> {
        Band::from_meters(meters)
            .and_then(|band| self.center_mhz(band))
            .ok_or(Error::UnsupportedBand(meters))
    }

    /// Bands listed in the plan, lowest frequency first.
    pub fn bands(&self) -> impl Iterator<Item = Band> + '_ {
        self.centers.keys().copied()
    }
}

impl Default for BandPlan {
    fn default() -> Self {
        let centers = [
            (Band::Band160m, 1.900),
            (Band::Band80m, 3.750),
            (Band::Band60m, 5.358),
            (Band::Band40m, 7.150),
            (Band::Band30m, 10.125),
            (Band::Band20m, 14.175),
            (Band::Band17m, 18.118),
            (Band::Band15m, 21.225),
            (Band::Band12m, 24.940),
            (Band::Band10m, 28.850),
            (Band::Band6m, 50.500),
        ];
        BandPlan {
            centers: centers.into_iter().collect(),
        }
    }
}
