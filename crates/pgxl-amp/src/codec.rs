//! PGXL command bodies.
//!
//! The amplifier speaks the counted line protocol with CRLF terminators.
//! Builders here return the body only; the engine adds `C<seq>|`.
//!
//! ```text
//! operate=1                                   OPERATE
//! operate=0                                   STANDBY
//! setup biasA=RADIO_AAB biasB=RADIO_AAB       bias for both radio inputs
//! setup bandA=20                              band of input A, in metres
//! status                                      telemetry snapshot
//! info                                        identity and configuration
//! ```

use std::fmt;
use std::str::FromStr;

use pgxl_core::{Band, Error};

/// Telemetry query body.
pub const CMD_STATUS: &str = "status";

/// Identity query body.
pub const CMD_INFO: &str = "info";

/// PA bias class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum BiasMode {
    /// Class AB.
    AB,
    /// Class AAB (higher idle current, better linearity).
    AAB,
}

impl BiasMode {
    /// Both modes, in the order suites sweep them.
    pub fn all() -> [BiasMode; 2] {
        [BiasMode::AB, BiasMode::AAB]
    }

    /// Wire token, e.g. `AAB`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasMode::AB => "AB",
            BiasMode::AAB => "AAB",
        }
    }
}

impl fmt::Display for BiasMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BiasMode {
    type Err = Error;

    /// Case-insensitive; anything other than AB or AAB is rejected.
    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AB" => Ok(BiasMode::AB),
            "AAB" => Ok(BiasMode::AAB),
            other => Err(Error::InvalidParameter(format!(
                "bias mode must be AB or AAB, got {other:?}"
            ))),
        }
    }
}

/// `operate=1` or `operate=0`.
pub fn cmd_operate(on: bool) -> String {
    format!("operate={}", if on { 1 } else { 0 })
}

/// Same bias mode on both radio inputs.
pub fn cmd_bias(mode: BiasMode) -> String {
    format!("setup biasA=RADIO_{mode} biasB=RADIO_{mode}")
}

/// Band selection for input A.
pub fn cmd_band(band: Band) -> String {
    format!("setup bandA={}", band.meters())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operate_bodies() {
        assert_eq!(cmd_operate(true), "operate=1");
        assert_eq!(cmd_operate(false), "operate=0");
    }

    #[test]
    fn bias_bodies() {
        assert_eq!(cmd_bias(BiasMode::AB), "setup biasA=RADIO_AB biasB=RADIO_AB");
        assert_eq!(
            cmd_bias(BiasMode::AAB),
            "setup biasA=RADIO_AAB biasB=RADIO_AAB"
        );
    }

    #[test]
    fn band_body() {
        assert_eq!(cmd_band(Band::Band20m), "setup bandA=20");
        assert_eq!(cmd_band(Band::Band160m), "setup bandA=160");
    }

    #[test]
    fn bias_parse_is_case_insensitive() {
        assert_eq!("aab".parse::<BiasMode>().unwrap(), BiasMode::AAB);
        assert_eq!(" Ab ".parse::<BiasMode>().unwrap(), BiasMode::AB);
    }

    #[test]
    fn bias_parse_rejects_unknown() {
        assert!(matches!(
            "A".parse::<BiasMode>(),
            Err(Error::InvalidParameter(_))
        ));
        assert!("".parse::<BiasMode>().is_err());
        assert!("CLASS_C".parse::<BiasMode>().is_err());
    }
}
