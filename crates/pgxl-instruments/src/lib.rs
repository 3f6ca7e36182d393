//! Bench measurement backends for the PGXL testkit.
//!
//! The RF suites only need `sweep(start, stop, points) -> (frequencies,
//! values)` plus raw SCPI queries; [`MeasurementBackend`] is that contract.
//!
//! - [`SimulatedVna`] -- computed low-pass traces, per vendor profile
//! - [`ScpiVna`] -- a networked VNA over raw-socket SCPI

pub mod backend;
pub mod scpi;
pub mod simulated;

use std::time::Duration;

pub use backend::{linear_axis, MeasurementBackend, Sweep, VnaVendor};
pub use scpi::{ScpiVna, DEFAULT_SCPI_PORT, DEFAULT_SCPI_TIMEOUT};
pub use simulated::{LowPassProfile, SimulatedVna};

/// Open the configured backend.
///
/// Simulation is used when requested or when no host is given.
pub async fn open_backend(
    vendor: VnaVendor,
    host: Option<&str>,
    port: u16,
    timeout: Duration,
    simulate: bool,
) -> pgxl_core::Result<Box<dyn MeasurementBackend>> {
    match host {
        Some(host) if !simulate => {
            let vna = ScpiVna::connect(vendor, host, port, timeout).await?;
            Ok(Box::new(vna))
        }
        _ => {
            tracing::info!(%vendor, "using simulated VNA");
            Ok(Box::new(SimulatedVna::new(vendor)))
        }
    }
}
