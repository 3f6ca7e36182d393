//! pgxl-test-harness: Test utilities for the PGXL testkit drivers.
//!
//! This crate provides [`ScriptedTransport`] for deterministic unit testing
//! of the line-protocol engine without real hardware, and [`MockLineServer`]
//! for end-to-end tests that go through a real TCP socket.

pub mod mock_server;
pub mod scripted;

pub use mock_server::MockLineServer;
pub use scripted::ScriptedTransport;
