mod display;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use dastgate_core::config::{self, EnvConfig, RunConfig, RunMode};
use dastgate_core::gate::GateReport;
use dastgate_core::pipeline::{self, RunSummary};
use dastgate_core::report;
use dastgate_core::{DastError, RiskLevel, TokioClock, ZapClient};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dastgate",
    version,
    about = "dastgate - DAST orchestration and security gate for CI",
    long_about = "Drive a ZAP-compatible scanner through an authenticated crawl and active scan, \
                  collect its alerts, and fail the build when High or Critical findings remain."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Settings file (defaults to ./dastgate.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lowest risk that fails the gate (critical, high, medium, low, info)
    #[arg(long, default_value = "high", value_parser = parse_risk)]
    fail_on: RiskLevel,

    /// Also write a SARIF 2.1.0 report to this path
    #[arg(long)]
    sarif: Option<PathBuf>,

    /// Output format for the gate summary
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticated scan: session setup, spiders, active scans, passive wait, gate
    Scan(ScanArgs),

    /// Unauthenticated spider and passive scan, then gate
    Baseline(ScanArgs),

    /// Evaluate a saved alerts file without contacting the scanner
    Gate {
        /// Alerts JSON written by a previous run, or a raw scanner alerts array
        #[arg(short, long, default_value = "zap-alerts.json")]
        input: PathBuf,

        /// Lowest risk that fails the gate
        #[arg(long, default_value = "high", value_parser = parse_risk)]
        fail_on: RiskLevel,

        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a starter dastgate.toml
    Init {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn parse_risk(value: &str) -> std::result::Result<RiskLevel, String> {
    RiskLevel::parse_threshold(value).ok_or_else(|| {
        format!("unknown risk '{value}' (expected critical, high, medium, low or info)")
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Scan(args) => cmd_scan(RunMode::Authenticated, args).await,
        Commands::Baseline(args) => cmd_scan(RunMode::Baseline, args).await,
        Commands::Gate {
            input,
            fail_on,
            format,
        } => cmd_gate(&input, fail_on, format),
        Commands::Init { output } => cmd_init(output.as_deref()).map(|_| 0),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "dastgate", &mut std::io::stdout());
            Ok(0)
        }
    };

    if let Err(err) = &result {
        if let Some(DastError::MissingEnv(missing)) = err.downcast_ref::<DastError>() {
            display::print_missing_env(missing);
        } else {
            display::print_error(err);
        }
    }
    ExitCode::from(exit_status(&result))
}

/// Gate verdicts pass through; any error exits 1.
fn exit_status(result: &Result<u8>) -> u8 {
    match result {
        Ok(code) => *code,
        Err(_) => 1,
    }
}

fn init_logging(verbose: bool) {
    // Target prefix match covers both the binary and dastgate_core.
    let filter = if verbose { "dastgate=debug" } else { "dastgate=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_scan(mode: RunMode, args: ScanArgs) -> Result<u8> {
    // Validate the environment before anything touches the network.
    let env = EnvConfig::from_env(mode)?;
    let settings = config::resolve_settings(args.config.as_deref())
        .context("Failed to load settings")?;
    let mut run = RunConfig::assemble(env, settings);
    if args.sarif.is_some() {
        run.settings.reports.sarif = args.sarif;
    }

    let client = ZapClient::from_config(&run)?;
    let clock = TokioClock::new();
    info!(
        "Scanner at {}, target {}",
        client.base_url(),
        run.target_url
    );

    let outcome = match mode {
        RunMode::Authenticated => pipeline::run_authenticated(&client, &clock, &run).await,
        RunMode::Baseline => pipeline::run_baseline(&client, &clock, &run).await,
    };
    let summary = match outcome {
        Ok(summary) => summary,
        Err(e @ DastError::AuthVerification { .. }) => {
            error!("{e}");
            anyhow::bail!("Authentication failed, scan aborted");
        }
        Err(e) => return Err(e).context("Scan aborted"),
    };

    let written =
        report::write_artifacts(&client, &run.target_url, &summary.alerts, &run.settings.reports)
            .await;
    let gate = GateReport::evaluate_at(&summary.alerts, args.fail_on);
    emit(&summary, &gate, &written, args.format)?;
    Ok(exit_code(&gate))
}

fn cmd_gate(input: &Path, fail_on: RiskLevel, format: OutputFormat) -> Result<u8> {
    let alerts = report::json::load_alerts(input)
        .with_context(|| format!("Failed to read alerts from {}", input.display()))?;
    let gate = GateReport::evaluate_at(&alerts, fail_on);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&gate)?),
        OutputFormat::Text => display::print_gate_report(&gate),
    }
    Ok(exit_code(&gate))
}

fn cmd_init(output: Option<&Path>) -> Result<()> {
    let content = config::generate_default_settings();
    match output {
        Some(path) => {
            if path.exists() {
                anyhow::bail!("'{}' already exists, refusing to overwrite", path.display());
            }
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Settings written to {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn emit(
    summary: &RunSummary,
    gate: &GateReport,
    written: &[PathBuf],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "run": summary,
                "gate": gate,
                "artifacts": written,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            display::print_run_summary(summary, written);
            display::print_gate_report(gate);
        }
    }
    Ok(())
}

fn exit_code(gate: &GateReport) -> u8 {
    gate.verdict.exit_code() as u8
}
