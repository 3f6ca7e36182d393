//! Output low-pass filter S21, measured directly on the VNA.
//!
//! The amplifier RF path is not involved; the operator rewires the LPF
//! module to the instrument first, so the case refuses to start until the
//! checklist is confirmed.

use async_trait::async_trait;
use serde_json::json;

use pgxl_instruments::Sweep;

use crate::runner::{RunContext, Scenario, TestCaseResult};

/// Checklist title shown before the sweep.
pub const LPF_CHECKLIST_TITLE: &str = "LPF S21 Sweep - Tech Checklist\n\
This test requires a direct connection of the PGXL LPF module to the VNA.\n\
PGXL RF path must NOT be used for this measurement.";

/// Items the operator confirms before the sweep.
pub const LPF_CHECKLIST: &[&str] = &[
    "PGXL is in STANDBY and exciter RF is OFF.",
    "Disconnect PGXL RF IN/OUT. Remove any coax jumpers to the amplifier path.",
    "Connect VNA Port 1 to LPF INPUT (amp-side).",
    "Connect VNA Port 2 to LPF OUTPUT (antenna-side).",
    "Perform a 2-port calibration (SOLT or fixture cal) across the sweep band.",
    "Verify 50-ohm terminations and attenuators as needed to protect the VNA.",
];

/// Sweep range and pass limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LpfLimits {
    pub start_hz: f64,
    pub stop_hz: f64,
    pub points: usize,
    /// Every point at or below this frequency must be within `passband_max_db`.
    pub passband_edge_hz: f64,
    pub passband_max_db: f64,
    /// Every point at or above this frequency must be at most `stopband_max_db`.
    pub stopband_edge_hz: f64,
    pub stopband_max_db: f64,
}

impl Default for LpfLimits {
    fn default() -> Self {
        LpfLimits {
            start_hz: 1e6,
            stop_hz: 150e6,
            points: 801,
            passband_edge_hz: 60e6,
            passband_max_db: 0.5,
            stopband_edge_hz: 100e6,
            stopband_max_db: -35.0,
        }
    }
}

impl LpfLimits {
    pub fn passband_ok(&self, sweep: &Sweep) -> bool {
        sweep
            .points()
            .filter(|&(f, _)| f <= self.passband_edge_hz)
            .all(|(_, db)| db <= self.passband_max_db)
    }

    pub fn stopband_ok(&self, sweep: &Sweep) -> bool {
        sweep
            .points()
            .filter(|&(f, _)| f >= self.stopband_edge_hz)
            .all(|(_, db)| db <= self.stopband_max_db)
    }
}

#[derive(Default)]
pub struct LpfSweepScenario {
    limits: LpfLimits,
}

impl LpfSweepScenario {
    pub fn with_limits(limits: LpfLimits) -> Self {
        LpfSweepScenario { limits }
    }
}

#[async_trait]
impl Scenario for LpfSweepScenario {
    fn id(&self) -> &'static str {
        "lpf_sweep.s21"
    }

    async fn run(&self, ctx: &RunContext, result: &mut TestCaseResult) -> anyhow::Result<()> {
        if !ctx.confirm(LPF_CHECKLIST_TITLE, LPF_CHECKLIST) {
            result.fail("Aborted: checklist not confirmed.");
            return Ok(());
        }

        let limits = self.limits;
        let mut vna = ctx.open_backend().await?;
        result.log(format!("Backend: {}", vna.name()));
        let swept = vna
            .sweep(limits.start_hz, limits.stop_hz, limits.points)
            .await;
        if let Err(e) = vna.close().await {
            tracing::warn!(error = %e, "closing VNA failed");
        }
        let sweep = swept?;

        let dir = ctx.run_dir("lpf_sweep")?;
        let rows: Vec<Vec<String>> = sweep
            .points()
            .map(|(f, db)| vec![format!("{}", f.round() as u64), db.to_string()])
            .collect();
        result.artifact(dir.write_csv("lpf_s21.csv", &["freq_hz", "s21_db"], &rows)?);
        result.artifact(dir.write_context(&json!({
            "suite": "lpf_sweep",
            "start_hz": limits.start_hz,
            "stop_hz": limits.stop_hz,
            "points": limits.points,
        }))?);

        let passband_ok = limits.passband_ok(&sweep);
        let stopband_ok = limits.stopband_ok(&sweep);
        result.metric("passband_ok", passband_ok);
        result.metric("stopband_ok", stopband_ok);
        if passband_ok && stopband_ok {
            result.log("LPF S21 sweep PASS.");
        } else {
            result.fail(format!(
                "LPF S21 sweep FAIL (passband_ok={passband_ok}, stopband_ok={stopband_ok})."
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_split_the_trace() {
        let limits = LpfLimits::default();
        let sweep = Sweep::new(vec![10e6, 60e6, 80e6, 100e6, 150e6], vec![0.3, 0.5, -10.0, -36.0, -60.0]);
        assert!(limits.passband_ok(&sweep));
        assert!(limits.stopband_ok(&sweep));

        let lossy = Sweep::new(vec![10e6, 60e6], vec![0.3, 0.6]);
        assert!(!limits.passband_ok(&lossy));

        let leaky = Sweep::new(vec![100e6, 120e6], vec![-40.0, -30.0]);
        assert!(!limits.stopband_ok(&leaky));
    }

    #[test]
    fn checklist_has_every_step() {
        assert_eq!(LPF_CHECKLIST.len(), 6);
        assert!(LPF_CHECKLIST[0].contains("STANDBY"));
    }
}
