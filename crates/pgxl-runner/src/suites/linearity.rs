//! Two-tone IMD3 on 20 m.

use async_trait::async_trait;
use serde_json::json;

use pgxl_flex::{FlexRadio, RadioMode};
use pgxl_instruments::Sweep;

use crate::runner::{RunContext, Scenario, TestCaseResult};

/// Where and how finely the two-tone spectrum is swept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearityPlan {
    pub band_m: u16,
    pub center_hz: f64,
    /// Offset of each tone from the center.
    pub tone_hz: f64,
    pub rbw_hz: f64,
}

impl Default for LinearityPlan {
    fn default() -> Self {
        LinearityPlan {
            band_m: 20,
            center_hz: 14.2e6,
            tone_hz: 700.0,
            rbw_hz: 1000.0,
        }
    }
}

impl LinearityPlan {
    /// Sweep span: five tone offsets either side of the center.
    pub fn span(&self) -> (f64, f64) {
        let half = 5.0 * self.tone_hz;
        (self.center_hz - half, self.center_hz + half)
    }

    /// 100 Hz bins across the span, ends included.
    pub fn points(&self) -> usize {
        let (start, stop) = self.span();
        ((stop - start) / 100.0).round() as usize + 1
    }

    /// `(tone level, IMD3 relative to the tones)` read from a trace.
    pub fn imd3(&self, sweep: &Sweep) -> Option<(f64, f64)> {
        let at = |offset: f64| sweep.value_near(self.center_hz + offset);
        let tone = (at(-self.tone_hz)? + at(self.tone_hz)?) / 2.0;
        let third = (at(-3.0 * self.tone_hz)? + at(3.0 * self.tone_hz)?) / 2.0;
        Some((tone, third - tone))
    }
}

#[derive(Default)]
pub struct LinearityScenario {
    plan: LinearityPlan,
}

impl LinearityScenario {
    async fn two_tone_up(&self, radio: &mut FlexRadio) -> pgxl_core::Result<()> {
        radio.set_band(self.plan.band_m).await?;
        radio.set_mode(RadioMode::Usb).await?;
        radio.set_two_tone(true).await
    }
}

#[async_trait]
impl Scenario for LinearityScenario {
    fn id(&self) -> &'static str {
        "linearity.harmonics"
    }

    async fn run(&self, ctx: &RunContext, result: &mut TestCaseResult) -> anyhow::Result<()> {
        let plan = self.plan;
        let dir = ctx.run_dir("linearity_harmonics")?;
        let mut radio = ctx.connect_flex().await?;

        let measured = async {
            if let Some(radio) = radio.as_mut() {
                self.two_tone_up(radio).await?;
            }
            let mut sa = ctx.open_backend().await?;
            let (start, stop) = plan.span();
            let swept = sa.sweep(start, stop, plan.points()).await;
            if let Err(e) = sa.close().await {
                tracing::warn!(error = %e, "closing analyzer failed");
            }
            anyhow::Ok(swept?)
        }
        .await;

        if let Some(radio) = radio.as_mut() {
            if let Err(e) = radio.set_two_tone(false).await {
                tracing::warn!(error = %e, "two-tone off failed");
            }
            radio.disconnect().await;
        }
        let sweep = measured?;

        let Some((tone, imd3)) = plan.imd3(&sweep) else {
            result.fail("Sweep returned no points.");
            return Ok(());
        };
        result.artifact(dir.write_csv(
            "imd.csv",
            &["band_m", "fc_hz", "tone_hz", "rbw_hz", "tone_level_dbm", "imd3_dbc"],
            &[vec![
                plan.band_m.to_string(),
                (plan.center_hz as u64).to_string(),
                (plan.tone_hz as u64).to_string(),
                (plan.rbw_hz as u64).to_string(),
                format!("{tone:.2}"),
                format!("{imd3:.2}"),
            ]],
        )?);
        result.artifact(dir.write_context(&json!({
            "suite": "linearity_harmonics",
            "fc": plan.center_hz,
            "tone": plan.tone_hz,
            "rbw": plan.rbw_hz,
        }))?);
        result.metric("tone_level_dbm", tone);
        result.metric("imd3_dbc", imd3);
        result.log(format!("IMD3 {imd3:.2} dBc at tone level {tone:.2} dBm."));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgxl_instruments::linear_axis;

    #[test]
    fn span_lands_on_tone_bins() {
        let plan = LinearityPlan::default();
        assert_eq!(plan.span(), (14_196_500.0, 14_203_500.0));
        assert_eq!(plan.points(), 71);
        let axis = linear_axis(plan.span().0, plan.span().1, plan.points());
        assert!(axis.iter().any(|&f| (f - 14_200_700.0).abs() < 1e-3));
        assert!(axis.iter().any(|&f| (f - 14_197_900.0).abs() < 1e-3));
    }

    #[test]
    fn imd3_is_relative_to_tones() {
        let plan = LinearityPlan::default();
        let (start, stop) = plan.span();
        let freqs = linear_axis(start, stop, plan.points());
        let values = freqs
            .iter()
            .map(|&f| {
                let off = (f - plan.center_hz).abs();
                if (off - 700.0).abs() < 1.0 {
                    -10.0
                } else if (off - 2100.0).abs() < 1.0 {
                    -42.0
                } else {
                    -100.0
                }
            })
            .collect();
        let (tone, imd3) = plan.imd3(&Sweep::new(freqs, values)).unwrap();
        assert_eq!(tone, -10.0);
        assert_eq!(imd3, -32.0);
    }

    #[test]
    fn empty_trace_has_no_reading() {
        assert!(LinearityPlan::default().imd3(&Sweep::default()).is_none());
    }
}
