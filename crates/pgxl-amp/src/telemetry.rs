//! Typed view of the PGXL `status` reply.

use std::collections::BTreeMap;

use serde::Serialize;

use pgxl_core::parse_f64;
use pgxl_line_io::Reply;

/// One telemetry snapshot.
///
/// Every field the reply omits, or carries as a non-number, is `None`
/// rather than zero. The full key/value map is kept in `raw`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Telemetry {
    /// Drain voltage in volts (`vdd`).
    pub drain_voltage: Option<f64>,
    /// Drain current in amperes (`id`).
    pub drain_current: Option<f64>,
    /// Output SWR (`swr`).
    pub swr: Option<f64>,
    /// Forward power in watts (`fwd`).
    pub forward_power: Option<f64>,
    /// PA heatsink temperature in °C (`hltemp`, else `temp`).
    pub pa_temperature: Option<f64>,
    /// Power-supply temperature in °C (`temp`).
    pub ps_temperature: Option<f64>,
    /// Fan mode as reported, e.g. `AUTO`.
    pub fan_mode: Option<String>,
    /// Every field of the reply.
    pub raw: BTreeMap<String, String>,
}

impl Telemetry {
    /// Map a `status` reply's fields.
    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        let num = |key: &str| parse_f64(fields.get(key));
        Telemetry {
            drain_voltage: num("vdd"),
            drain_current: num("id"),
            swr: num("swr"),
            forward_power: num("fwd"),
            pa_temperature: num("hltemp").or_else(|| num("temp")),
            ps_temperature: num("temp"),
            fan_mode: fields.get("fanmode").cloned(),
            raw: fields,
        }
    }
}

impl From<Reply> for Telemetry {
    fn from(reply: Reply) -> Self {
        Telemetry::from_fields(reply.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgxl_line_io::parse_reply;

    fn telemetry(line: &str, seq: u32) -> Telemetry {
        parse_reply(line, 'R', seq).unwrap().into()
    }

    #[test]
    fn maps_known_keys() {
        let t = telemetry("R7|0|vdd=48.1 id=2.3 fanmode=AUTO", 7);
        assert_eq!(t.drain_voltage, Some(48.1));
        assert_eq!(t.drain_current, Some(2.3));
        assert_eq!(t.fan_mode.as_deref(), Some("AUTO"));
        assert_eq!(t.swr, None);
        assert_eq!(t.forward_power, None);
        assert_eq!(t.pa_temperature, None);
    }

    #[test]
    fn pa_temperature_prefers_hltemp() {
        let t = telemetry("R1|0|hltemp=41.5 temp=35.0", 1);
        assert_eq!(t.pa_temperature, Some(41.5));
        assert_eq!(t.ps_temperature, Some(35.0));

        let t = telemetry("R1|0|temp=35.0", 1);
        assert_eq!(t.pa_temperature, Some(35.0));
    }

    #[test]
    fn non_numeric_is_unknown() {
        let t = telemetry("R2|0|vdd=n/a swr=1.15 fwd=", 2);
        assert_eq!(t.drain_voltage, None);
        assert_eq!(t.swr, Some(1.15));
        assert_eq!(t.forward_power, None);
        assert_eq!(t.raw.get("vdd").map(String::as_str), Some("n/a"));
    }

    #[test]
    fn serializes_unknown_as_null() {
        let t = telemetry("R3|0|vdd=50", 3);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["drain_voltage"], 50.0);
        assert!(json["drain_current"].is_null());
        assert_eq!(json["raw"]["vdd"], "50");
    }
}
