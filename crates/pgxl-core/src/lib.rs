//! pgxl-core: Core traits, types, and error definitions for the PGXL testkit.
//!
//! This crate defines the device-agnostic pieces every driver shares. The
//! amplifier and radio drivers, the bench instruments and the suite runner
//! depend on these types without pulling in each other.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Band`] / [`BandPlan`] -- band identification and center frequencies
//! - [`Error`] / [`Result`] -- error handling

pub mod band;
pub mod error;
pub mod helpers;
pub mod transport;

pub use band::{Band, BandPlan, ParseBandError};
pub use error::{Error, Result};
pub use helpers::{clamp_percent, format_mhz, parse_f64};
pub use transport::Transport;
