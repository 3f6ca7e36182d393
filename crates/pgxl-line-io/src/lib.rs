//! Counted-transaction line protocol shared by the PGXL amplifier and the
//! FlexRadio SmartSDR command port.
//!
//! One [`LineLink`] owns one TCP session. It frames commands as
//! `C<seq>|<body>`, matches `R<seq>|` replies, and scans every other line
//! for pushed state.
//!
//! # Architecture
//!
//! - [`protocol`] -- dialects, encoding, line classification, reply parsing
//! - [`framer`] -- byte stream to trimmed lines
//! - [`state`] -- last-seen values of watched pushed fields
//! - [`engine`] -- sequence counter and transactions
//! - [`session`] -- connect, priming, subscription, disconnect

pub mod engine;
pub mod framer;
pub mod protocol;
pub mod session;
pub mod state;

pub use engine::{LineLink, POLL_INTERVAL};
pub use framer::LineFramer;
pub use protocol::{parse_fields, parse_reply, Dialect, LineKind, Reply, StrayReplyPolicy};
pub use session::{LinkConfig, Priming, SessionState, Subscription};
pub use state::CachedState;
