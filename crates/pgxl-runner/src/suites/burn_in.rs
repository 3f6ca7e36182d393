//! Long keyed-carrier soak with periodic telemetry.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;

use pgxl_amp::{PowerGeniusXl, Telemetry};
use pgxl_flex::{FlexRadio, RadioMode};

use crate::artifacts::num_cell;
use crate::runner::{RunContext, Scenario, TestCaseResult};

use super::release;

const BURN_IN_DRIVE_PERCENT: i32 = 10;

/// How a soak loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Elapsed,
    Cancelled,
}

pub struct BurnInScenario;

fn sample_row(elapsed: Duration, t: &Telemetry) -> Vec<String> {
    vec![
        elapsed.as_secs().to_string(),
        num_cell(t.pa_temperature),
        num_cell(t.ps_temperature),
        num_cell(t.drain_voltage),
        num_cell(t.drain_current),
        num_cell(t.swr),
        num_cell(t.forward_power),
    ]
}

impl BurnInScenario {
    async fn key_up(radio: &mut FlexRadio) -> pgxl_core::Result<()> {
        radio.set_mode(RadioMode::Cw).await?;
        radio.set_drive_percent(BURN_IN_DRIVE_PERCENT).await?;
        radio.key_carrier_on().await
    }

    async fn soak(
        ctx: &RunContext,
        amp: &mut PowerGeniusXl,
        rows: &mut Vec<Vec<String>>,
    ) -> anyhow::Result<Finish> {
        let duration = Duration::from_secs(ctx.config.burn_in.duration_s);
        let interval = Duration::from_secs(ctx.config.burn_in.interval_s);
        let cancel = ctx.cancel_token();
        let started = Instant::now();

        while started.elapsed() < duration {
            let telemetry = amp.telemetry().await?;
            rows.push(sample_row(started.elapsed(), &telemetry));
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => return Ok(Finish::Cancelled),
            }
        }
        Ok(Finish::Elapsed)
    }
}

#[async_trait]
impl Scenario for BurnInScenario {
    fn id(&self) -> &'static str {
        "burn_in.2h"
    }

    async fn run(&self, ctx: &RunContext, result: &mut TestCaseResult) -> anyhow::Result<()> {
        let dir = ctx.run_dir("burn_in")?;
        let mut amp = ctx.connect_amp().await?;
        let mut radio = match ctx.connect_flex().await {
            Ok(radio) => radio,
            Err(e) => {
                amp.disconnect().await;
                return Err(e);
            }
        };

        let mut rows = Vec::new();
        let outcome = async {
            amp.operate().await?;
            if let Some(radio) = radio.as_mut() {
                Self::key_up(radio).await?;
            }
            Self::soak(ctx, &mut amp, &mut rows).await
        }
        .await;

        if let Some(radio) = radio.as_mut() {
            if let Err(e) = radio.key_carrier_off().await {
                tracing::warn!(error = %e, "unkeying carrier failed");
                result.log(format!("Carrier unkey failed: {e}"));
            }
        }
        release(Some(&mut amp), radio.as_mut()).await;

        // Whatever was sampled is kept, even when the loop stopped early.
        result.artifact(dir.write_csv(
            "telemetry.csv",
            &["t_sec", "pa_temp_c", "ps_temp_c", "vd_v", "id_a", "swr", "pout_w"],
            &rows,
        )?);
        result.artifact(dir.write_context(&json!({
            "suite": "burn_in",
            "interval_s": ctx.config.burn_in.interval_s,
            "duration_s": ctx.config.burn_in.duration_s,
        }))?);
        result.metric("samples", rows.len());

        match outcome? {
            Finish::Elapsed => result.log(format!("Burn-in completed, {} samples.", rows.len())),
            Finish::Cancelled => {
                let secs = rows
                    .last()
                    .and_then(|row| row.first())
                    .cloned()
                    .unwrap_or_else(|| "0".to_string());
                result.fail(format!("Burn-in cancelled after {secs}s"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_layout() {
        let t = Telemetry {
            pa_temperature: Some(41.5),
            drain_voltage: Some(48.1),
            forward_power: Some(1200.0),
            ..Default::default()
        };
        assert_eq!(
            sample_row(Duration::from_millis(10_900), &t),
            vec!["10", "41.5", "", "48.1", "", "", "1200"]
        );
    }
}
