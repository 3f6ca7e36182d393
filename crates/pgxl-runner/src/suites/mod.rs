//! Acceptance suites.
//!
//! Each suite is one or more [`Scenario`]s looked up by name.

mod burn_in;
mod drain;
mod gain_band;
mod linearity;
mod lpf_sweep;

use anyhow::bail;

use pgxl_amp::PowerGeniusXl;
use pgxl_flex::{FlexRadio, RadioMode};

use crate::runner::Scenario;

pub use burn_in::BurnInScenario;
pub use drain::{DrainMetric, DrainScenario};
pub use gain_band::{GainScenario, DRIVE_LEVELS};
pub use linearity::{LinearityPlan, LinearityScenario};
pub use lpf_sweep::{LpfLimits, LpfSweepScenario, LPF_CHECKLIST, LPF_CHECKLIST_TITLE};

/// Every suite name, in menu order.
pub const SUITE_NAMES: &[&str] = &[
    "lpf_sweep",
    "burn_in",
    "gain_band",
    "drain_current",
    "drain_voltage",
    "linearity_harmonics",
];

/// Scenarios of a suite.
pub fn discover(suite: &str) -> anyhow::Result<Vec<Box<dyn Scenario>>> {
    let scenarios: Vec<Box<dyn Scenario>> = match suite {
        "lpf_sweep" => vec![Box::new(LpfSweepScenario::default())],
        "burn_in" => vec![Box::new(BurnInScenario)],
        "gain_band" => vec![Box::new(GainScenario)],
        "drain_current" => vec![Box::new(DrainScenario::new(DrainMetric::Current))],
        "drain_voltage" => vec![Box::new(DrainScenario::new(DrainMetric::Voltage))],
        "linearity_harmonics" => vec![Box::new(LinearityScenario::default())],
        other => bail!("unknown suite {other:?} (known: {})", SUITE_NAMES.join(", ")),
    };
    Ok(scenarios)
}

/// Put the radio on `meters`, CW, at `drive` percent.
async fn prepare_cw(radio: &mut FlexRadio, meters: u16, drive: i32) -> pgxl_core::Result<()> {
    radio.set_band(meters).await?;
    radio.set_mode(RadioMode::Cw).await?;
    radio.set_drive_percent(drive).await?;
    Ok(())
}

/// Close both sessions.
async fn release(amp: Option<&mut PowerGeniusXl>, radio: Option<&mut FlexRadio>) {
    if let Some(radio) = radio {
        radio.disconnect().await;
    }
    if let Some(amp) = amp {
        amp.disconnect().await;
    }
}
