//! Amplifier gain per band at a few drive levels.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;

use pgxl_amp::PowerGeniusXl;
use pgxl_flex::FlexRadio;

use crate::runner::{RunContext, Scenario, TestCaseResult};

use super::{prepare_cw, release};

/// Drive levels swept on every band, in percent.
pub const DRIVE_LEVELS: [i32; 3] = [5, 10, 20];

/// Floor applied to both powers before taking the ratio.
const POWER_FLOOR: f64 = 1e-3;

/// Gain in dB of `pout` over `drive`.
pub(crate) fn gain_db(pout: f64, drive: f64) -> f64 {
    10.0 * (pout.max(POWER_FLOOR) / drive.max(POWER_FLOOR)).log10()
}

struct GainRow {
    meters: u16,
    drive: i32,
    pout: f64,
    gain: f64,
}

pub struct GainScenario;

impl GainScenario {
    async fn measure(
        ctx: &RunContext,
        amp: &mut PowerGeniusXl,
        mut radio: Option<&mut FlexRadio>,
    ) -> anyhow::Result<Vec<GainRow>> {
        let mut rows = Vec::new();
        for band in ctx.config.bands()? {
            let meters = band.meters();
            amp.set_band(meters).await?;
            for drive in DRIVE_LEVELS {
                if let Some(radio) = radio.as_deref_mut() {
                    prepare_cw(radio, meters, drive).await?;
                }
                let pout = amp.telemetry().await?.forward_power.unwrap_or(0.0);
                let gain = gain_db(pout, f64::from(drive));
                tracing::debug!(meters, drive, pout, gain, "gain reading");
                rows.push(GainRow {
                    meters,
                    drive,
                    pout,
                    gain,
                });
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl Scenario for GainScenario {
    fn id(&self) -> &'static str {
        "gain.per_band"
    }

    async fn run(&self, ctx: &RunContext, result: &mut TestCaseResult) -> anyhow::Result<()> {
        let dir = ctx.run_dir("gain_band")?;
        let mut amp = ctx.connect_amp().await?;
        let mut radio = match ctx.connect_flex().await {
            Ok(radio) => radio,
            Err(e) => {
                amp.disconnect().await;
                return Err(e);
            }
        };

        let measured = Self::measure(ctx, &mut amp, radio.as_mut()).await;
        release(Some(&mut amp), radio.as_mut()).await;
        let rows = measured?;

        let csv_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| {
                vec![
                    r.meters.to_string(),
                    r.drive.to_string(),
                    r.pout.to_string(),
                    format!("{:.2}", r.gain),
                ]
            })
            .collect();
        result.artifact(dir.write_csv(
            "gain.csv",
            &["band_m", "drive_w", "pout_w", "gain_db"],
            &csv_rows,
        )?);

        // Per-band gain at the middle drive level.
        let at_ten: BTreeMap<String, f64> = rows
            .iter()
            .filter(|r| r.drive == 10)
            .map(|r| (r.meters.to_string(), r.gain))
            .collect();
        result.metric("gain_db_at_10", json!(at_ten));

        result.artifact(dir.write_context(&json!({
            "suite": "gain_band",
            "drive_levels": DRIVE_LEVELS,
            "bands_m": ctx.config.bands_m,
        }))?);
        result.log("Gain per band computed.");
        Ok(())
    }
}
