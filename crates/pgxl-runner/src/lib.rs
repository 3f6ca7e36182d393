//! Acceptance-test runner for the PGXL bench.
//!
//! Loads an [`AppConfig`], runs a named suite case by case against the
//! amplifier, the radio and a measurement backend, writes CSV and JSON
//! artifacts per run, and reports the outcome to the console or as JUnit
//! XML.
//!
//! ```no_run
//! use pgxl_runner::{AppConfig, ConsoleReporter, RunContext, TestRunner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::load("bench.yaml".as_ref())?;
//! let runner = TestRunner::new(RunContext::new(config));
//! let result = runner.run("drain_current").await?;
//! ConsoleReporter.emit(&result);
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod config;
pub mod report;
pub mod runner;
pub mod suites;

pub use artifacts::RunDir;
pub use config::{AppConfig, BurnInConfig, FlexConfig, PgxlConfig, VnaConfig};
pub use report::{ConsoleReporter, JUnitReporter};
pub use runner::{
    CaseStatus, ConfirmFn, RunContext, Scenario, SuiteResult, TestCaseResult, TestRunner,
};
pub use suites::SUITE_NAMES;
