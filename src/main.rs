// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ha_monitor::{
    annotations::run_annotations,
    config::{load_config, Config},
    constants::{DEFAULT_CONFIG_PATH, TOKIO_WORKER_THREADS},
    errors::ProviderSetupError,
    health::ServiceProbe,
    log_store::GithubLogStore,
    metrics,
    model::HealthReport,
    provider::{self, DnsProvider},
    reconcilers::ReconcileMode,
    run::{execute_health_checks, execute_reconciliation, execute_run, Diagnostic, RunReport},
    run_log::{build_log_lines, commit_message, current_run_id, log_path},
    status_reasons::REASON_LOG_SHIPPING_FAILED,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

/// Health-check driven DNS failover.
#[derive(Parser, Debug)]
#[command(name = "ha-monitor", version, about)]
struct Cli {
    /// Configuration file (JSON, or YAML by extension)
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Probe every service and print the health results
    Check {
        /// Write JSON results to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Reconcile DNS from previously produced health results
    Reconcile {
        /// Health results file, `-` for stdin
        #[arg(long, default_value = "-")]
        health: String,

        /// Report drift without mutating DNS
        #[arg(long)]
        dry_run: bool,

        /// Write JSON results to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Probe, reconcile, annotate and log in one go
    Run {
        /// Report drift without mutating DNS
        #[arg(long)]
        dry_run: bool,

        /// Write the JSON run report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write Prometheus metrics in text format to this file
        #[arg(long)]
        metrics_file: Option<PathBuf>,

        /// Do not append the run log to the repository
        #[arg(long)]
        skip_log: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("ha-monitor")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

/// Initialize logging on stderr so stdout stays machine-readable.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`text` or `json`).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<ExitCode> {
    initialize_logging();

    // Already installed is fine
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!(config = %cli.config.display(), "Starting ha-monitor");
    let config = load_config(&cli.config)
        .await
        .inspect_err(|_| metrics::record_error("config"))?;
    debug!(
        servers = config.servers.len(),
        services = config.services.len(),
        "Configuration loaded"
    );

    match cli.command {
        Command::Check { output } => check(&config, output.as_deref()).await,
        Command::Reconcile {
            health,
            dry_run,
            output,
        } => reconcile(&config, &health, mode(dry_run), output.as_deref()).await,
        Command::Run {
            dry_run,
            output,
            metrics_file,
            skip_log,
        } => {
            run(
                &config,
                mode(dry_run),
                output.as_deref(),
                metrics_file.as_deref(),
                skip_log,
            )
            .await
        }
    }
}

fn mode(dry_run: bool) -> ReconcileMode {
    if dry_run {
        ReconcileMode::DryRun
    } else {
        ReconcileMode::Apply
    }
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn connect_provider(config: &Config) -> Result<Arc<dyn DnsProvider>, ProviderSetupError> {
    let client = provider::connect(&config.cloudflare)?;
    Ok(Arc::new(client))
}

/// Serialize `value` as pretty JSON to `output`, or stdout.
async fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => tokio::fs::write(path, format!("{json}\n"))
            .await
            .with_context(|| format!("Failed to write results to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Parse a health results handoff.
fn parse_health(content: &str) -> Result<BTreeMap<String, HealthReport>> {
    if content.trim().is_empty() {
        anyhow::bail!("No health results received");
    }
    serde_json::from_str(content).context("Failed to parse health results")
}

async fn read_health(source: &str) -> Result<BTreeMap<String, HealthReport>> {
    let content = if source == "-" {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("Failed to read health results from stdin")?;
        buffer
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read health results from {source}"))?
    };
    parse_health(&content)
}

async fn check(config: &Config, output: Option<&Path>) -> Result<ExitCode> {
    let phase = execute_health_checks(config, &ServiceProbe::default()).await;
    write_json(&phase.results, output).await?;

    let failed = phase.results.values().any(HealthReport::has_failures);
    Ok(exit_code(failed))
}

async fn reconcile(
    config: &Config,
    health_source: &str,
    mode: ReconcileMode,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let health = read_health(health_source).await?;
    let phase = execute_reconciliation(config, &health, || connect_provider(config), mode).await;

    for diagnostic in &phase.diagnostics {
        warn!(reason = %diagnostic.reason, "{}", diagnostic.message);
    }
    write_json(&phase.results, output).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run(
    config: &Config,
    mode: ReconcileMode,
    output: Option<&Path>,
    metrics_file: Option<&Path>,
    skip_log: bool,
) -> Result<ExitCode> {
    let started = Instant::now();
    let probe = ServiceProbe::default();
    let mut report = execute_run(config, &probe, || connect_provider(config), mode).await;

    if config.logging.enabled && !skip_log {
        if let Err(e) = ship_log(config, &report).await {
            error!(error = %e, "Failed to log results");
            metrics::record_error("log_store");
            report.diagnostics.push(Diagnostic::new(
                None,
                REASON_LOG_SHIPPING_FAILED,
                format!("{e:#}"),
            ));
        }
    }

    for line in run_annotations(&report, |name| {
        config.service(name).map(|s| s.hostname.as_str())
    }) {
        println!("{line}");
    }

    write_json(&report, output).await?;

    metrics::record_run_duration(started.elapsed());
    if let Some(path) = metrics_file {
        let text = metrics::gather_metrics()?;
        tokio::fs::write(path, text)
            .await
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    let failed = report.should_fail();
    if failed {
        let services: Vec<&str> = report.failing_services().collect();
        warn!(services = ?services, "Health checks failed");
    } else {
        info!("All health checks passed");
    }
    Ok(exit_code(failed))
}

async fn ship_log(config: &Config, report: &RunReport) -> Result<()> {
    let now = Utc::now();
    let lines = build_log_lines(config, report, &current_run_id(), now)?;
    let store = GithubLogStore::from_settings(&config.logging)?;
    store
        .append(&log_path(now), &lines, &commit_message(now))
        .await?;
    Ok(())
}
