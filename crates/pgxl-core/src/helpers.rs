//! Formatting and conversion helpers shared by the device drivers.

/// Format a frequency in MHz the way device command bodies expect it.
///
/// Always six decimal places with a `.` separator, independent of locale.
///
/// # Example
///
/// ```
/// use pgxl_core::format_mhz;
///
/// assert_eq!(format_mhz(14.2), "14.200000");
/// assert_eq!(format_mhz(1.9), "1.900000");
/// ```
pub fn format_mhz(freq_mhz: f64) -> String {
    format!("{freq_mhz:.6}")
}

/// Clamp a power setting to the 0..=100 percent range the radio accepts.
pub fn clamp_percent(percent: i32) -> u8 {
    percent.clamp(0, 100) as u8
}

/// Parse an optional numeric field, returning `None` when the key is
/// missing or the value is not a number.
pub fn parse_f64(value: Option<&String>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_mhz_six_decimals() {
        assert_eq!(format_mhz(14.2), "14.200000");
        assert_eq!(format_mhz(50.5), "50.500000");
        assert_eq!(format_mhz(7.0001234), "7.000123");
    }

    #[test]
    fn clamp_percent_range() {
        assert_eq!(clamp_percent(150), 100);
        assert_eq!(clamp_percent(-5), 0);
        assert_eq!(clamp_percent(42), 42);
        assert_eq!(clamp_percent(100), 100);
        assert_eq!(clamp_percent(0), 0);
    }

    #[test]
    fn parse_f64_tolerates_missing_and_junk() {
        let good = "48.1".to_string();
        let junk = "n/a".to_string();
        assert_eq!(parse_f64(Some(&good)), Some(48.1));
        assert_eq!(parse_f64(Some(&junk)), None);
        assert_eq!(parse_f64(None), None);
    }
}
