//! Drain current and drain voltage per band and bias mode.

use async_trait::async_trait;
use serde_json::json;

use pgxl_amp::{BiasMode, PowerGeniusXl, Telemetry};
use pgxl_flex::FlexRadio;

use crate::artifacts::num_cell;
use crate::runner::{RunContext, Scenario, TestCaseResult};

use super::{prepare_cw, release};

/// Drive used while reading drain figures.
const DRAIN_DRIVE_PERCENT: i32 = 10;

/// Which telemetry value a drain run records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMetric {
    Current,
    Voltage,
}

impl DrainMetric {
    fn suite(self) -> &'static str {
        match self {
            DrainMetric::Current => "drain_current",
            DrainMetric::Voltage => "drain_voltage",
        }
    }

    fn column(self) -> &'static str {
        match self {
            DrainMetric::Current => "id_a",
            DrainMetric::Voltage => "vd_v",
        }
    }

    fn read(self, telemetry: &Telemetry) -> Option<f64> {
        match self {
            DrainMetric::Current => telemetry.drain_current,
            DrainMetric::Voltage => telemetry.drain_voltage,
        }
    }
}

pub struct DrainScenario {
    metric: DrainMetric,
}

impl DrainScenario {
    pub fn new(metric: DrainMetric) -> Self {
        DrainScenario { metric }
    }

    async fn measure(
        &self,
        ctx: &RunContext,
        amp: &mut PowerGeniusXl,
        mut radio: Option<&mut FlexRadio>,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        let mut rows = Vec::new();
        for band in ctx.config.bands()? {
            let meters = band.meters();
            amp.set_band(meters).await?;
            if let Some(radio) = radio.as_deref_mut() {
                prepare_cw(radio, meters, DRAIN_DRIVE_PERCENT).await?;
            }
            for mode in BiasMode::all() {
                amp.set_bias_mode(mode).await?;
                let telemetry = amp.telemetry().await?;
                let value = self.metric.read(&telemetry);
                tracing::debug!(meters, %mode, ?value, "drain reading");
                rows.push(vec![meters.to_string(), mode.to_string(), num_cell(value)]);
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl Scenario for DrainScenario {
    fn id(&self) -> &'static str {
        match self.metric {
            DrainMetric::Current => "drain.current_per_band_mode",
            DrainMetric::Voltage => "drain.voltage_per_band_mode",
        }
    }

    async fn run(&self, ctx: &RunContext, result: &mut TestCaseResult) -> anyhow::Result<()> {
        let suite = self.metric.suite();
        let dir = ctx.run_dir(suite)?;
        let mut amp = ctx.connect_amp().await?;
        let mut radio = match ctx.connect_flex().await {
            Ok(radio) => radio,
            Err(e) => {
                amp.disconnect().await;
                return Err(e);
            }
        };
        if radio.is_none() {
            result.log("No radio configured; drive left as is.");
        }

        let measured = self.measure(ctx, &mut amp, radio.as_mut()).await;
        release(Some(&mut amp), radio.as_mut()).await;
        let rows = measured?;

        let column = self.metric.column();
        let csv = dir.write_csv(&format!("{suite}.csv"), &["band_m", "mode", column], &rows)?;
        result.artifact(csv);
        result.artifact(dir.write_context(&json!({
            "suite": suite,
            "modes": BiasMode::all(),
            "bands_m": ctx.config.bands_m,
        }))?);

        let missing = rows.iter().filter(|row| row[2].is_empty()).count();
        if missing > 0 {
            result.log(format!("{missing} readings had no {column} value"));
        }
        result.metric("rows", rows.len());
        result.log(format!("Recorded {} {column} readings.", rows.len()));
        Ok(())
    }
}
