//! Hubstrap CLI
//!
//! Runs one bootstrap attempt for a user the way the hub would before the
//! first spawn, and reports whether the spawn may proceed.

use chrono::{DateTime, Utc};
use clap::Parser;
use hubstrap::{
    Bootstrap, BootstrapConfig, ConfigError, ConfigOverrides, RunOutcome, SpawnerRef, StrategyKind,
    UserRef,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing::{Level, error, info};
use tracing_subscriber::fmt;

/// Exit code when the bootstrap aborts the spawn
const EXIT_ABORTED: i32 = 1;
/// Exit code for configuration errors
const EXIT_CONFIG: i32 = 2;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "hubstrap")]
#[command(about = "Run the pre-spawn bootstrap for a user")]
struct Args {
    /// User name, passed to the bootstrap script as its first argument
    #[arg(short, long)]
    user: String,

    /// Named server being spawned (empty for the default server)
    #[arg(long, default_value = "")]
    server: String,

    /// Config file path (default: <config dir>/hubstrap/bootstrap.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strategy override (none, script_runner)
    #[arg(long)]
    class: Option<StrategyKind>,

    /// Script path override
    #[arg(long)]
    script: Option<PathBuf>,

    /// Script timeout override in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Whether bootstrap failures are ignored (true) or abort the spawn (false)
    #[arg(long, value_name = "BOOL")]
    ignore_errors: Option<bool>,

    /// Shorthand for --ignore-errors false
    #[arg(long, conflicts_with = "ignore_errors")]
    fail_fast: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Summary of one attempt
#[derive(Debug, Serialize)]
struct Report {
    user: String,
    server: String,
    strategy: &'static str,
    started_at: DateTime<Utc>,
    elapsed_ms: u64,
    spawn_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<RunOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hubstrap").join("bootstrap.toml"))
}

/// Config file, then environment, then CLI flags
fn resolve_config(args: &Args) -> Result<BootstrapConfig, ConfigError> {
    let file = match &args.config {
        Some(path) => Some(path.clone()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let overrides = ConfigOverrides {
        class: args.class,
        ignore_errors: if args.fail_fast {
            Some(false)
        } else {
            args.ignore_errors
        },
        script: args.script.clone(),
        execution_timeout_secs: args.timeout,
    };

    BootstrapConfig::resolve(file.as_deref(), &overrides)
}

fn print_report(report: &Report, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => error!(error = %e, "Failed to serialize report"),
        }
        return;
    }

    let verdict = if report.spawn_allowed { "proceed" } else { "abort" };
    let detail = match (&report.outcome, &report.error) {
        (_, Some(e)) => e.clone(),
        (Some(RunOutcome::SoftFailed { reason }), None) => format!("soft failure: {}", reason),
        (Some(RunOutcome::Skipped), None) => "skipped".to_string(),
        (Some(RunOutcome::Completed), None) => "completed".to_string(),
        (None, None) => String::new(),
    };
    println!(
        "{} [{}] {}: {} ({} ms)",
        report.user, report.strategy, verdict, detail, report.elapsed_ms
    );
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid bootstrap configuration");
            process::exit(EXIT_CONFIG);
        }
    };

    info!(
        class = %config.class,
        ignore_errors = config.ignore_errors,
        "Configuration loaded"
    );

    let bootstrap = match Bootstrap::from_config(
        UserRef::new(args.user.clone()),
        SpawnerRef::new(args.server.clone()),
        &config,
    ) {
        Ok(bootstrap) => bootstrap,
        Err(e) => {
            error!(error = %e, "Failed to build bootstrap strategy");
            process::exit(EXIT_CONFIG);
        }
    };

    let started_at = Utc::now();
    let start = Instant::now();
    let result = bootstrap.run().await;

    let mut report = Report {
        user: args.user.clone(),
        server: args.server.clone(),
        strategy: bootstrap.strategy_name(),
        started_at,
        elapsed_ms: start.elapsed().as_millis() as u64,
        spawn_allowed: result.is_ok(),
        outcome: None,
        error: None,
    };

    let code = match result {
        Ok(outcome) => {
            report.outcome = Some(outcome);
            0
        }
        Err(e) => {
            let mut message = e.to_string();
            if let Some(source) = std::error::Error::source(&e) {
                message.push_str(&format!(": {}", source));
            }
            report.error = Some(message);
            EXIT_ABORTED
        }
    };

    print_report(&report, args.json);
    process::exit(code);
}
