//! SmartSDR demodulation modes.
//!
//! FlexRadio uses uppercase ASCII mode strings (`"USB"`, `"CW"`, `"DIGU"`)
//! in slice commands. Bench procedures type them in any case, so parsing is
//! case-insensitive; the wire form is always uppercase.

use std::fmt;
use std::str::FromStr;

use pgxl_core::Error;

/// A SmartSDR slice mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioMode {
    Usb,
    Lsb,
    Cw,
    Am,
    /// Synchronous AM.
    Sam,
    Fm,
    /// Narrow FM.
    Nfm,
    /// Data FM.
    Dfm,
    /// Data on upper sideband.
    Digu,
    /// Data on lower sideband.
    Digl,
    Rtty,
    /// FreeDV.
    Fdv,
}

const ALL_MODES: &[RadioMode] = &[
    RadioMode::Usb,
    RadioMode::Lsb,
    RadioMode::Cw,
    RadioMode::Am,
    RadioMode::Sam,
    RadioMode::Fm,
    RadioMode::Nfm,
    RadioMode::Dfm,
    RadioMode::Digu,
    RadioMode::Digl,
    RadioMode::Rtty,
    RadioMode::Fdv,
];

impl RadioMode {
    /// Every mode the radio accepts.
    pub fn all() -> &'static [RadioMode] {
        ALL_MODES
    }

    /// SmartSDR mode string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RadioMode::Usb => "USB",
            RadioMode::Lsb => "LSB",
            RadioMode::Cw => "CW",
            RadioMode::Am => "AM",
            RadioMode::Sam => "SAM",
            RadioMode::Fm => "FM",
            RadioMode::Nfm => "NFM",
            RadioMode::Dfm => "DFM",
            RadioMode::Digu => "DIGU",
            RadioMode::Digl => "DIGL",
            RadioMode::Rtty => "RTTY",
            RadioMode::Fdv => "FDV",
        }
    }

    /// Whether the two-tone tune source works in this mode.
    ///
    /// Two-tone needs a sideband (or synchronous AM) transmit chain.
    pub fn supports_two_tone(&self) -> bool {
        matches!(
            self,
            RadioMode::Usb | RadioMode::Lsb | RadioMode::Digu | RadioMode::Digl | RadioMode::Sam
        )
    }
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RadioMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let wanted = s.trim().to_ascii_uppercase();
        ALL_MODES
            .iter()
            .copied()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown SmartSDR mode: {s:?}")))
    }
}
