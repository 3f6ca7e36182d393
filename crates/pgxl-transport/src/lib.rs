//! Transport implementations for the PGXL testkit.
//!
//! This crate provides the concrete [`Transport`](pgxl_core::Transport)
//! used against real hardware:
//!
//! - [`TcpTransport`]: a TCP connection to the PGXL amplifier, the FlexRadio
//!   command port, or a SCPI instrument

pub mod tcp;

pub use tcp::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_WRITE_TIMEOUT, TcpTransport};
