//! Power Genius XL amplifier driver.
//!
//! The PGXL is controlled over TCP port 9008 with the counted line protocol
//! (`C<seq>|<body>\r\n` answered by `R<seq>|<status>|<fields>`). This crate
//! provides:
//!
//! - **Command builders** ([`codec`]) -- `operate`, `setup bias*`,
//!   `setup bandA`, `status`, `info`.
//! - **Telemetry** ([`telemetry`]) -- the `status` reply as typed fields,
//!   with unknown values kept as `None`.
//! - **PowerGeniusXl** ([`amp`]) -- the driver.
//! - **PgxlBuilder** ([`builder`]) -- connection and timeout settings.

pub mod amp;
pub mod builder;
pub mod codec;
pub mod telemetry;

pub use amp::PowerGeniusXl;
pub use builder::{DEFAULT_PORT, PgxlBuilder};
pub use codec::BiasMode;
pub use telemetry::Telemetry;
