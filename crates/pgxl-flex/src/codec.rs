//! SmartSDR command bodies used by the bench.
//!
//! Each builder returns the command string WITHOUT the `C<seq>|` prefix.
//! The prefix is added by the line engine when it assigns a sequence number.
//! Slice 0 is always the controlled slice.

use pgxl_core::format_mhz;

use crate::mode::RadioMode;

/// Subscription sent after connecting.
pub const CMD_SUBSCRIBE: &str = "sub radio all";

/// Status field carrying the band-persistence flag.
pub const FIELD_BAND_PERSISTENCE: &str = "band_persistence_enabled";

/// Example output: `"slice s 0 mode=USB"`
pub fn cmd_slice_mode(mode: RadioMode) -> String {
    format!("slice s 0 mode={mode}")
}

/// Designate slice 0 as the TX slice.
pub fn cmd_slice_tx() -> String {
    "slice s 0 tx=1".to_string()
}

/// Example output: `"slice t 0 14.200000"`
pub fn cmd_slice_tune(freq_mhz: f64) -> String {
    format!("slice t 0 {}", format_mhz(freq_mhz))
}

/// Example output: `"transmit set rfpower=50"`
pub fn cmd_rf_power(percent: u8) -> String {
    format!("transmit set rfpower={percent}")
}

/// Example output: `"transmit set tunepower=10"`
pub fn cmd_tune_power(percent: u8) -> String {
    format!("transmit set tunepower={percent}")
}

/// `transmit tune on` or `transmit tune off`.
pub fn cmd_tune(on: bool) -> String {
    format!("transmit tune {}", if on { "on" } else { "off" })
}

/// Select the two-tone or single-tone tune source.
pub fn cmd_tune_mode(two_tone: bool) -> String {
    format!(
        "transmit set tune_mode={}",
        if two_tone { "two_tone" } else { "single_tone" }
    )
}

/// Example output: `"radio set band_persistence_enabled=0"`
pub fn cmd_band_persistence(enabled: bool) -> String {
    format!(
        "radio set {FIELD_BAND_PERSISTENCE}={}",
        if enabled { 1 } else { 0 }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_commands() {
        assert_eq!(cmd_slice_mode(RadioMode::Cw), "slice s 0 mode=CW");
        assert_eq!(cmd_slice_mode(RadioMode::Digu), "slice s 0 mode=DIGU");
        assert_eq!(cmd_slice_tx(), "slice s 0 tx=1");
    }

    #[test]
    fn tune_uses_six_decimals() {
        assert_eq!(cmd_slice_tune(14.2), "slice t 0 14.200000");
        assert_eq!(cmd_slice_tune(1.9), "slice t 0 1.900000");
        assert_eq!(cmd_slice_tune(50.5), "slice t 0 50.500000");
    }

    #[test]
    fn transmit_commands() {
        assert_eq!(cmd_rf_power(100), "transmit set rfpower=100");
        assert_eq!(cmd_tune_power(0), "transmit set tunepower=0");
        assert_eq!(cmd_tune(true), "transmit tune on");
        assert_eq!(cmd_tune(false), "transmit tune off");
        assert_eq!(cmd_tune_mode(true), "transmit set tune_mode=two_tone");
        assert_eq!(cmd_tune_mode(false), "transmit set tune_mode=single_tone");
    }

    #[test]
    fn band_persistence_command() {
        assert_eq!(
            cmd_band_persistence(false),
            "radio set band_persistence_enabled=0"
        );
        assert_eq!(
            cmd_band_persistence(true),
            "radio set band_persistence_enabled=1"
        );
    }
}
