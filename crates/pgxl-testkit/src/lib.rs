//! # pgxl-testkit -- PGXL amplifier and FlexRadio bench automation
//!
//! `pgxl-testkit` drives a Power Genius XL amplifier and a FlexRadio
//! SmartSDR transceiver over their counted-transaction TCP line protocols,
//! and runs the acceptance suites built on top of them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pgxl_testkit::amp::PgxlBuilder;
//! use pgxl_testkit::flex::{FlexRadioBuilder, RadioMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut amp = PgxlBuilder::new().host("192.168.1.50").build().await?;
//!     let mut radio = FlexRadioBuilder::new().host("192.168.1.40").build().await?;
//!
//!     radio.set_band(20).await?;
//!     radio.set_mode(RadioMode::Cw).await?;
//!     amp.set_band(20).await?;
//!
//!     let telemetry = amp.telemetry().await?;
//!     println!("Vd {:?} V, Id {:?} A", telemetry.drain_voltage, telemetry.drain_current);
//!
//!     radio.disconnect().await;
//!     amp.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate               | Purpose                                              |
//! |---------------------|------------------------------------------------------|
//! | `pgxl-core`         | Error type, transport trait, bands and band plan     |
//! | `pgxl-transport`    | TCP transport                                        |
//! | `pgxl-line-io`      | Line framer, transaction engine, session, cache      |
//! | `pgxl-amp`          | Power Genius XL façade                               |
//! | `pgxl-flex`         | FlexRadio SmartSDR façade                            |
//! | `pgxl-instruments`  | VNA backends (simulated and SCPI)                    |
//! | `pgxl-runner`       | Acceptance suites, artifacts and reporters           |
//! | **`pgxl-testkit`**  | This facade crate -- re-exports everything           |
//!
//! ## Feature Flags
//!
//! | Feature       | Enables                                   | Default |
//! |---------------|-------------------------------------------|---------|
//! | `amp`         | [`amp`] module                            | yes     |
//! | `flex`        | [`flex`] module                           | yes     |
//! | `instruments` | [`instruments`] module                    | no      |
//! | `runner`      | [`runner`] module (implies all the above) | no      |
//! | `full`        | Everything                                | no      |

pub use pgxl_core::*;

/// The counted line protocol: framing, transactions, sessions and the
/// pushed-state cache.
pub mod line {
    pub use pgxl_line_io::*;
}

/// TCP transport.
pub mod tcp {
    pub use pgxl_transport::*;
}

/// Power Genius XL amplifier.
///
/// Provides [`PowerGeniusXl`](amp::PowerGeniusXl) and
/// [`PgxlBuilder`](amp::PgxlBuilder). Commands go out with CRLF framing and
/// a reply tagged with any other sequence number is an error.
#[cfg(feature = "amp")]
pub mod amp {
    pub use pgxl_amp::*;
}

/// FlexRadio SmartSDR transceiver.
///
/// Provides [`FlexRadio`](flex::FlexRadio) and
/// [`FlexRadioBuilder`](flex::FlexRadioBuilder). The connection is primed
/// by draining the status burst the radio sends on connect.
#[cfg(feature = "flex")]
pub mod flex {
    pub use pgxl_flex::*;
}

/// Measurement backends for the RF suites.
#[cfg(feature = "instruments")]
pub mod instruments {
    pub use pgxl_instruments::*;
}

/// Acceptance-test runner, suites and reporters.
#[cfg(feature = "runner")]
pub mod runner {
    pub use pgxl_runner::*;
}
