// pgxl-testkit command-line tool -- direct PGXL and FlexRadio control plus
// the acceptance suites.
//
// Usage:
//   pgxl-testkit pgxl status --amp-host 192.168.1.50
//   pgxl-testkit pgxl bias AAB --amp-host 192.168.1.50
//   pgxl-testkit flex freq 14.2 --flex-host 192.168.1.40
//   pgxl-testkit flex batch --flex-host 192.168.1.40 --mode USB --band 20 \
//       --tunepower 10 --two-tone on --tune-on --hold 30
//   pgxl-testkit run lpf_sweep --config bench.yaml --junit junit.xml
//   pgxl-testkit suites

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pgxl_testkit::amp::{BiasMode, PgxlBuilder, PowerGeniusXl};
use pgxl_testkit::flex::{FlexRadio, FlexRadioBuilder, RadioMode};
use pgxl_testkit::runner::{
    AppConfig, ConfirmFn, ConsoleReporter, JUnitReporter, RunContext, SUITE_NAMES, TestRunner,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// PGXL testkit -- amplifier and radio control, acceptance suites.
#[derive(Parser)]
#[command(name = "pgxl-testkit", version, about)]
struct Cli {
    /// Debug logging (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Control the Power Genius XL amplifier.
    Pgxl {
        #[command(subcommand)]
        action: PgxlAction,
    },

    /// Control the FlexRadio over SmartSDR TCP.
    Flex {
        #[command(subcommand)]
        action: FlexAction,
    },

    /// Run an acceptance suite.
    Run {
        /// Suite name, e.g. lpf_sweep.
        suite: String,

        /// Path to the bench configuration YAML.
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Artifact directory (overrides artifacts_dir from the config).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// List the suite's cases without running them.
        #[arg(long)]
        list: bool,

        /// Write a JUnit XML report to this path.
        #[arg(long)]
        junit: Option<PathBuf>,

        /// Treat operator checklists as confirmed.
        #[arg(long)]
        yes: bool,
    },

    /// List the known suites.
    Suites,
}

#[derive(Args, Clone)]
struct AmpTarget {
    /// PGXL IP address or hostname.
    #[arg(long)]
    amp_host: String,

    /// PGXL TCP port.
    #[arg(long, default_value_t = pgxl_testkit::amp::DEFAULT_PORT)]
    amp_port: u16,
}

#[derive(Args, Clone)]
struct FlexTarget {
    /// FlexRadio IP address or hostname.
    #[arg(long)]
    flex_host: String,

    /// FlexRadio TCP port.
    #[arg(long, default_value_t = pgxl_testkit::flex::DEFAULT_PORT)]
    flex_port: u16,

    /// Leave band persistence as the radio has it instead of turning it
    /// off on connect.
    #[arg(long)]
    keep_band_persistence: bool,
}

#[derive(Subcommand)]
enum PgxlAction {
    /// Print the telemetry record as JSON.
    Status {
        #[command(flatten)]
        target: AmpTarget,
    },
    /// Print the info fields as JSON.
    Info {
        #[command(flatten)]
        target: AmpTarget,
    },
    /// Switch to OPERATE.
    Operate {
        #[command(flatten)]
        target: AmpTarget,
    },
    /// Switch to STANDBY.
    Standby {
        #[command(flatten)]
        target: AmpTarget,
    },
    /// Set the bias mode of both PAs.
    Bias {
        /// AB or AAB.
        mode: String,
        #[command(flatten)]
        target: AmpTarget,
    },
    /// Select the band of input A.
    Band {
        /// 160, 80, 60, 40, 30, 20, 17, 15, 12, 10 or 6.
        band_m: u16,
        #[command(flatten)]
        target: AmpTarget,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand)]
enum FlexAction {
    /// Set the slice 0 mode.
    Mode {
        /// CW, USB, LSB, AM, FM, DIGU, DIGL, ...
        mode: String,
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Tune slice 0.
    Freq {
        /// Frequency in MHz, e.g. 14.200.
        freq_mhz: f64,
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Tune slice 0 to a band center.
    Band {
        band_m: u16,
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Set RF power percent.
    Rfpower {
        #[arg(allow_negative_numbers = true)]
        percent: i32,
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Set TUNE power percent.
    Tunepower {
        #[arg(allow_negative_numbers = true)]
        percent: i32,
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Set both RF and TUNE power percent.
    Drive {
        #[arg(allow_negative_numbers = true)]
        percent: i32,
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Key the tune carrier.
    TuneOn {
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Unkey the tune carrier.
    TuneOff {
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Two-tone or single-tone tune source.
    TwoTone {
        #[arg(value_enum)]
        state: Switch,
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Per-band recall of radio settings.
    Persistence {
        #[arg(value_enum)]
        state: Switch,
        #[command(flatten)]
        target: FlexTarget,
    },
    /// Apply several settings over one connection.
    Batch(BatchArgs),
}

#[derive(Args)]
struct BatchArgs {
    #[command(flatten)]
    target: FlexTarget,

    /// Slice mode.
    #[arg(long)]
    mode: Option<String>,

    /// Band center to tune to (ignored when --freq is given).
    #[arg(long)]
    band: Option<u16>,

    /// Exact frequency in MHz.
    #[arg(long)]
    freq: Option<f64>,

    /// RF power percent.
    #[arg(long, allow_negative_numbers = true)]
    rfpower: Option<i32>,

    /// TUNE power percent.
    #[arg(long, allow_negative_numbers = true)]
    tunepower: Option<i32>,

    /// Two-tone tune source.
    #[arg(long, value_enum)]
    two_tone: Option<Switch>,

    /// Key the carrier at the end.
    #[arg(long, conflicts_with = "tune_off")]
    tune_on: bool,

    /// Unkey the carrier at the end.
    #[arg(long)]
    tune_off: bool,

    /// Keep the connection open for this many seconds; -1 holds until Ctrl-C.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true, value_parser = parse_hold)]
    hold: f64,
}

/// Seconds to hold; any negative value means until Ctrl-C.
fn parse_hold(s: &str) -> std::result::Result<f64, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if secs.is_nan() {
        return Err("not a number".to_string());
    }
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())?;
    }
    Ok(secs)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Show a checklist and wait for the operator to type YES.
fn checklist_confirm(title: &str, items: &[&str]) -> bool {
    println!("\n{title}");
    for (i, item) in items.iter().enumerate() {
        println!("  [{}] {item}", i + 1);
    }
    print!("Type 'YES' to confirm all steps are complete: ");
    io::stdout().flush().ok();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("YES")
}

async fn connect_amp(target: &AmpTarget) -> Result<PowerGeniusXl> {
    PgxlBuilder::new()
        .host(&target.amp_host)
        .port(target.amp_port)
        .build()
        .await
        .with_context(|| format!("connecting to PGXL at {}:{}", target.amp_host, target.amp_port))
}

async fn connect_flex(target: &FlexTarget) -> Result<FlexRadio> {
    FlexRadioBuilder::new()
        .host(&target.flex_host)
        .port(target.flex_port)
        .disable_band_persistence_on_connect(!target.keep_band_persistence)
        .build()
        .await
        .with_context(|| {
            format!(
                "connecting to FlexRadio at {}:{}",
                target.flex_host, target.flex_port
            )
        })
}

// ---------------------------------------------------------------------------
// PGXL commands
// ---------------------------------------------------------------------------

async fn cmd_pgxl(action: PgxlAction) -> Result<()> {
    let target = match &action {
        PgxlAction::Status { target }
        | PgxlAction::Info { target }
        | PgxlAction::Operate { target }
        | PgxlAction::Standby { target }
        | PgxlAction::Bias { target, .. }
        | PgxlAction::Band { target, .. } => target.clone(),
    };
    // Parse before connecting so a typo never touches the amplifier.
    let bias = match &action {
        PgxlAction::Bias { mode, .. } => Some(mode.parse::<BiasMode>()?),
        _ => None,
    };

    let mut amp = connect_amp(&target).await?;
    let result = run_pgxl(&mut amp, &action, bias).await;
    amp.disconnect().await;
    result
}

async fn run_pgxl(
    amp: &mut PowerGeniusXl,
    action: &PgxlAction,
    bias: Option<BiasMode>,
) -> Result<()> {
    match action {
        PgxlAction::Status { .. } => {
            let telemetry = amp.telemetry().await?;
            println!("{}", serde_json::to_string_pretty(&telemetry)?);
        }
        PgxlAction::Info { .. } => {
            let info = amp.info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        PgxlAction::Operate { .. } => {
            amp.operate().await?;
            println!("PGXL set to OPERATE");
        }
        PgxlAction::Standby { .. } => {
            amp.standby().await?;
            println!("PGXL set to STANDBY");
        }
        PgxlAction::Bias { .. } => {
            if let Some(mode) = bias {
                amp.set_bias_mode(mode).await?;
                println!("PGXL bias set to {mode}");
            }
        }
        PgxlAction::Band { band_m, .. } => {
            amp.set_band(*band_m).await?;
            println!("PGXL bandA set to {band_m}m");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// FlexRadio commands
// ---------------------------------------------------------------------------

fn flex_target(action: &FlexAction) -> &FlexTarget {
    match action {
        FlexAction::Mode { target, .. }
        | FlexAction::Freq { target, .. }
        | FlexAction::Band { target, .. }
        | FlexAction::Rfpower { target, .. }
        | FlexAction::Tunepower { target, .. }
        | FlexAction::Drive { target, .. }
        | FlexAction::TuneOn { target }
        | FlexAction::TuneOff { target }
        | FlexAction::TwoTone { target, .. }
        | FlexAction::Persistence { target, .. } => target,
        FlexAction::Batch(args) => &args.target,
    }
}

async fn cmd_flex(action: FlexAction) -> Result<()> {
    let mode = match &action {
        FlexAction::Mode { mode, .. } => Some(mode.parse::<RadioMode>()?),
        FlexAction::Batch(args) => args.mode.as_deref().map(str::parse::<RadioMode>).transpose()?,
        _ => None,
    };

    let mut radio = connect_flex(flex_target(&action)).await?;
    let result = match &action {
        FlexAction::Batch(args) => cmd_flex_batch(&mut radio, args, mode).await,
        other => run_flex(&mut radio, other, mode).await,
    };
    radio.disconnect().await;
    result
}

async fn run_flex(radio: &mut FlexRadio, action: &FlexAction, mode: Option<RadioMode>) -> Result<()> {
    match action {
        FlexAction::Mode { .. } => {
            if let Some(mode) = mode {
                radio.set_mode(mode).await?;
                println!("FlexRadio mode set to {mode}");
            }
        }
        FlexAction::Freq { freq_mhz, .. } => {
            radio.set_frequency_mhz(*freq_mhz).await?;
            println!("FlexRadio tuned slice 0 to {freq_mhz:.6} MHz");
        }
        FlexAction::Band { band_m, .. } => {
            radio.set_band(*band_m).await?;
            println!("FlexRadio tuned to the {band_m}m band center");
        }
        FlexAction::Rfpower { percent, .. } => {
            let applied = radio.set_rf_power_percent(*percent).await?;
            println!("FlexRadio RF power set to {applied}%");
        }
        FlexAction::Tunepower { percent, .. } => {
            let applied = radio.set_tune_power_percent(*percent).await?;
            println!("FlexRadio TUNE power set to {applied}%");
        }
        FlexAction::Drive { percent, .. } => {
            let applied = radio.set_drive_percent(*percent).await?;
            println!("FlexRadio rfpower & tunepower set to {applied}%");
        }
        FlexAction::TuneOn { .. } => {
            radio.key_carrier_on().await?;
            println!("FlexRadio TUNE on");
        }
        FlexAction::TuneOff { .. } => {
            radio.key_carrier_off().await?;
            println!("FlexRadio TUNE off");
        }
        FlexAction::TwoTone { state, .. } => {
            radio.set_two_tone(state.is_on()).await?;
            println!("FlexRadio two-tone {}", if state.is_on() { "on" } else { "off" });
        }
        FlexAction::Persistence { state, .. } => {
            radio.set_band_persistence(state.is_on()).await?;
            println!(
                "FlexRadio band persistence {}",
                if state.is_on() { "enabled" } else { "disabled" }
            );
        }
        FlexAction::Batch(_) => unreachable!("batch handled by cmd_flex_batch"),
    }
    Ok(())
}

async fn cmd_flex_batch(radio: &mut FlexRadio, args: &BatchArgs, mode: Option<RadioMode>) -> Result<()> {
    if let Some(mode) = mode {
        radio.set_mode(mode).await?;
        println!("Mode {mode}");
    }

    if let Some(freq) = args.freq {
        radio.set_frequency_mhz(freq).await?;
        println!("Frequency {freq:.6} MHz");
    } else if let Some(band) = args.band {
        radio.set_band(band).await?;
        println!("Band {band}m");
    }

    if let Some(pct) = args.rfpower {
        let applied = radio.set_rf_power_percent(pct).await?;
        println!("RF power {applied}%");
    }
    if let Some(pct) = args.tunepower {
        let applied = radio.set_tune_power_percent(pct).await?;
        println!("TUNE power {applied}%");
    }

    if let Some(state) = args.two_tone {
        match mode {
            Some(mode) if state.is_on() && !mode.supports_two_tone() => {
                println!("Two-tone not valid in {mode}; using single-tone.");
                radio.set_two_tone(false).await?;
            }
            _ => radio.set_two_tone(state.is_on()).await?,
        }
    }

    if args.tune_on {
        radio.key_carrier_on().await?;
        println!("TUNE on");
    } else if args.tune_off {
        radio.key_carrier_off().await?;
        println!("TUNE off");
    }

    let held = if args.hold < 0.0 {
        println!("Holding connection until Ctrl-C...");
        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?;
        true
    } else if args.hold > 0.0 {
        let hold = Duration::try_from_secs_f64(args.hold).context("invalid --hold")?;
        println!("Holding connection for {:.1}s...", args.hold);
        tokio::time::sleep(hold).await;
        true
    } else {
        if args.tune_on {
            println!("Note: TUNE drops when the client disconnects. Use --hold to keep it on.");
        }
        false
    };

    if held && args.tune_on {
        radio.key_carrier_off().await?;
        println!("TUNE off (after hold)");
    }
    println!("Batch complete.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Suites
// ---------------------------------------------------------------------------

async fn cmd_run(
    suite: &str,
    config: &Path,
    out: Option<PathBuf>,
    list: bool,
    junit: Option<PathBuf>,
    yes: bool,
) -> Result<ExitCode> {
    let mut config = AppConfig::load(config)?;
    if let Some(out) = out {
        config.artifacts_dir = out;
    }

    let cancel = CancellationToken::new();
    let ctx = RunContext::new(config)
        .with_confirm(if yes {
            Box::new(|_: &str, _: &[&str]| true) as ConfirmFn
        } else {
            Box::new(checklist_confirm) as ConfirmFn
        })
        .with_cancel(cancel.clone());
    let runner = TestRunner::new(ctx);

    if list {
        for id in runner.discover(suite)? {
            println!("{id}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, stopping");
            cancel.cancel();
        }
    });
    let result = runner.run(suite).await;
    watcher.abort();
    let result = result?;

    ConsoleReporter.emit(&result);
    if let Some(path) = junit {
        JUnitReporter.write(&result, &path)?;
    }
    println!(
        "Done. {} passed, {} failed, {} skipped.",
        result.passed(),
        result.failed(),
        result.skipped()
    );
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Pgxl { action } => cmd_pgxl(action).await?,
        Command::Flex { action } => cmd_flex(action).await?,
        Command::Run {
            suite,
            config,
            out,
            list,
            junit,
            yes,
        } => return cmd_run(&suite, &config, out, list, junit, yes).await,
        Command::Suites => {
            for name in SUITE_NAMES {
                println!("{name}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
