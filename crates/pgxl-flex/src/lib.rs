//! FlexRadio SmartSDR control for the PGXL bench.
//!
//! Drives slice 0 and the transmit chain of a FLEX-6000/8000 radio over the
//! SmartSDR TCP command port (4992), using the counted line protocol from
//! `pgxl-line-io`. It provides:
//!
//! - **Modes** ([`mode`]) -- the SmartSDR mode table.
//! - **Command builders** ([`codec`]) -- slice, transmit and radio bodies.
//! - **FlexRadio** ([`radio`]) -- the driver.
//! - **FlexRadioBuilder** ([`builder`]) -- connection settings, band plan,
//!   connect-time options.
//!
//! After connecting, the radio's status dump is drained and `sub radio all`
//! is sent, so pushed values such as the band-persistence flag are known
//! without a query.

pub mod builder;
pub mod codec;
pub mod mode;
pub mod radio;

pub use builder::{DEFAULT_PORT, FlexRadioBuilder};
pub use mode::RadioMode;
pub use radio::FlexRadio;
