//! Sequential scenario runner.
//!
//! A suite is a list of [`Scenario`]s. Each runs to completion before the
//! next starts, against devices it connects and disconnects itself. A
//! scenario that returns `Ok` without marking a failure or a skip passes;
//! an `Err` fails the case with the error chain in its log.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use pgxl_amp::{PgxlBuilder, PowerGeniusXl};
use pgxl_flex::{FlexRadio, FlexRadioBuilder};
use pgxl_instruments::{open_backend, MeasurementBackend};

use crate::artifacts::RunDir;
use crate::config::AppConfig;
use crate::suites;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Pass,
    Fail,
    Skip,
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaseStatus::Pass => "PASS",
            CaseStatus::Fail => "FAIL",
            CaseStatus::Skip => "SKIP",
        })
    }
}

/// Record of one case: counters, log lines, metrics and written files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestCaseResult {
    pub id: String,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub logs: Vec<String>,
    pub metrics: BTreeMap<String, serde_json::Value>,
    pub artifacts: Vec<PathBuf>,
}

impl TestCaseResult {
    pub fn new(id: &str) -> Self {
        TestCaseResult {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(message.into());
    }

    /// Mark the case failed with a reason.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.failed = 1;
        self.log(message);
    }

    /// Mark the case skipped with a reason.
    pub fn skip(&mut self, message: impl Into<String>) {
        self.skipped = 1;
        self.log(message);
    }

    pub fn metric(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.metrics.insert(key.to_string(), value.into());
    }

    pub fn artifact(&mut self, path: PathBuf) {
        self.artifacts.push(path);
    }

    pub fn status(&self) -> CaseStatus {
        if self.failed > 0 {
            CaseStatus::Fail
        } else if self.skipped > 0 {
            CaseStatus::Skip
        } else {
            CaseStatus::Pass
        }
    }
}

/// Every case of one suite run.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResult {
    pub suite: String,
    pub cases: Vec<TestCaseResult>,
}

impl SuiteResult {
    pub fn passed(&self) -> u32 {
        self.cases.iter().map(|c| c.passed).sum()
    }

    pub fn failed(&self) -> u32 {
        self.cases.iter().map(|c| c.failed).sum()
    }

    pub fn skipped(&self) -> u32 {
        self.cases.iter().map(|c| c.skipped).sum()
    }

    /// `true` when no case failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// One runnable test case.
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Stable case id, e.g. `drain.current_per_band_mode`.
    fn id(&self) -> &'static str;

    async fn run(&self, ctx: &RunContext, result: &mut TestCaseResult) -> anyhow::Result<()>;
}

/// Operator confirmation prompt: `(title, checklist) -> confirmed`.
pub type ConfirmFn = Box<dyn Fn(&str, &[&str]) -> bool + Send + Sync>;

/// What scenarios get to work with.
pub struct RunContext {
    pub config: AppConfig,
    confirm: ConfirmFn,
    cancel: CancellationToken,
}

impl RunContext {
    /// A context that declines every checklist and is never cancelled.
    pub fn new(config: AppConfig) -> Self {
        RunContext {
            config,
            confirm: Box::new(|_, _| false),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the checklist prompt.
    pub fn with_confirm(mut self, confirm: ConfirmFn) -> Self {
        self.confirm = confirm;
        self
    }

    /// Stop long-running scenarios when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn confirm(&self, title: &str, checklist: &[&str]) -> bool {
        (self.confirm)(title, checklist)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Connect to the configured amplifier.
    pub async fn connect_amp(&self) -> anyhow::Result<PowerGeniusXl> {
        let pgxl = &self.config.pgxl;
        PgxlBuilder::new()
            .host(&pgxl.host)
            .port(pgxl.port)
            .band_plan(self.config.band_plan()?)
            .build()
            .await
            .with_context(|| format!("pgxl {}:{}: connect", pgxl.host, pgxl.port))
    }

    /// Connect to the radio, if one is configured.
    pub async fn connect_flex(&self) -> anyhow::Result<Option<FlexRadio>> {
        let Some(flex) = &self.config.flex else {
            return Ok(None);
        };
        let radio = FlexRadioBuilder::new()
            .host(&flex.host)
            .port(flex.port)
            .band_plan(self.config.band_plan()?)
            .disable_band_persistence_on_connect(flex.disable_band_persistence)
            .build()
            .await
            .with_context(|| format!("flex {}:{}: connect", flex.host, flex.port))?;
        Ok(Some(radio))
    }

    /// Open the configured measurement backend.
    pub async fn open_backend(&self) -> anyhow::Result<Box<dyn MeasurementBackend>> {
        let vna = &self.config.vna;
        open_backend(
            vna.vendor,
            vna.host.as_deref(),
            vna.port,
            Duration::from_millis(vna.timeout_ms),
            vna.simulate,
        )
        .await
        .with_context(|| format!("vna {}: connect", vna.vendor))
    }

    /// Fresh timestamped artifact directory for `suite`.
    pub fn run_dir(&self, suite: &str) -> anyhow::Result<RunDir> {
        RunDir::create(&self.config.artifacts_dir, suite)
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs suites case by case.
pub struct TestRunner {
    ctx: RunContext,
}

impl TestRunner {
    pub fn new(ctx: RunContext) -> Self {
        TestRunner { ctx }
    }

    /// Case ids of a suite.
    pub fn discover(&self, suite: &str) -> anyhow::Result<Vec<&'static str>> {
        Ok(suites::discover(suite)?.iter().map(|s| s.id()).collect())
    }

    /// Run every case of a suite in order.
    pub async fn run(&self, suite: &str) -> anyhow::Result<SuiteResult> {
        let scenarios = suites::discover(suite)?;
        tracing::info!(suite, cases = scenarios.len(), "running suite");

        let mut cases = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            cases.push(self.run_case(scenario.as_ref()).await);
        }
        Ok(SuiteResult {
            suite: suite.to_string(),
            cases,
        })
    }

    async fn run_case(&self, scenario: &dyn Scenario) -> TestCaseResult {
        let mut result = TestCaseResult::new(scenario.id());
        match scenario.run(&self.ctx, &mut result).await {
            Ok(()) => {
                if result.failed == 0 && result.skipped == 0 {
                    result.passed = 1;
                }
            }
            Err(e) => {
                tracing::error!(case = scenario.id(), error = %format!("{e:#}"), "case failed");
                result.fail(format!("Error: {e:#}"));
            }
        }
        tracing::info!(case = scenario.id(), status = %result.status(), "case finished");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_precedence() {
        let mut r = TestCaseResult::new("x");
        assert_eq!(r.status(), CaseStatus::Pass);
        r.skip("no radio");
        assert_eq!(r.status(), CaseStatus::Skip);
        r.fail("boom");
        assert_eq!(r.status(), CaseStatus::Fail);
        assert_eq!(r.logs, vec!["no radio", "boom"]);
    }

    #[test]
    fn suite_totals() {
        let mut a = TestCaseResult::new("a");
        a.passed = 1;
        let mut b = TestCaseResult::new("b");
        b.fail("x");
        let mut c = TestCaseResult::new("c");
        c.skip("y");
        let suite = SuiteResult {
            suite: "s".into(),
            cases: vec![a, b, c],
        };
        assert_eq!((suite.passed(), suite.failed(), suite.skipped()), (1, 1, 1));
        assert!(!suite.is_success());
    }

    #[tokio::test]
    async fn unknown_suite_is_an_error() {
        let runner = TestRunner::new(RunContext::new(AppConfig::for_amplifier("127.0.0.1")));
        assert!(runner.run("no_such_suite").await.is_err());
        assert!(runner.discover("no_such_suite").is_err());
    }

    #[test]
    fn discover_lists_case_ids() {
        let runner = TestRunner::new(RunContext::new(AppConfig::for_amplifier("127.0.0.1")));
        assert_eq!(
            runner.discover("drain_voltage").unwrap(),
            vec!["drain.voltage_per_band_mode"]
        );
        assert_eq!(runner.discover("burn_in").unwrap(), vec!["burn_in.2h"]);
    }

    #[tokio::test]
    async fn unreachable_amplifier_fails_case_with_chain() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = AppConfig::for_amplifier("127.0.0.1");
        config.pgxl.port = port;
        config.bands_m = vec![20];
        config.artifacts_dir = std::env::temp_dir().join("pgxl-runner-unreachable");
        let runner = TestRunner::new(RunContext::new(config));

        let result = runner.run("drain_current").await.unwrap();
        assert_eq!(result.failed(), 1);
        let log = &result.cases[0].logs[0];
        assert!(log.starts_with("Error: pgxl 127.0.0.1:"), "{log}");
        assert!(log.contains("connection"), "{log}");
    }
}
