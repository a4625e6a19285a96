//! check-usage CLI
//!
//! Prints a usage report for a Kubernetes workload: per-pod CPU and memory,
//! horizontal pod autoscaler status and pod count. Runs once by default, or
//! periodically with `--interval`.

mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use reporter_lib::{
    init_tracing, Invoker, KubeControlPlane, ReportSink, RunMode, RunSummary, SnapshotCollector,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;

use crate::config::{Overrides, ReporterConfig};
use crate::output::{print_error, print_info, print_warning, OutputFormat};

/// Workload usage reporter
#[derive(Parser)]
#[command(name = "check-usage")]
#[command(author, version, about = "Usage and autoscaling status reporter for Kubernetes workloads", long_about = None)]
pub struct Cli {
    /// Label selector for the workload's pods [default: app=guestbook]
    #[arg(long, short = 'l')]
    pub selector: Option<String>,

    /// Horizontal pod autoscaler name [default: guestbook]
    #[arg(long)]
    pub scaler: Option<String>,

    /// Namespace (defaults to the kubeconfig namespace)
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Re-run every N seconds, appending each report to the log file
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Stop after N reports in periodic mode (needs an interval)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,

    /// Append reports to this file [periodic default: check-usage.log]
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Per-query timeout in seconds [default: 30]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Path to kubeconfig file (uses default discovery if not specified)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            selector: self.selector.clone(),
            scaler: self.scaler.clone(),
            namespace: self.namespace.clone(),
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
            timeout: self.timeout,
            interval: self.interval,
            count: self.count,
            log_file: self.log_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log_json) {
        print_warning(&format!("Logging unavailable: {}", e));
    }

    match run(cli).await {
        Ok(summary) if summary.all_failed() => {
            print_error(&format!(
                "All {} report runs failed; last error: {}",
                summary.runs,
                summary.last_error.as_deref().unwrap_or("unknown")
            ));
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let config = ReporterConfig::load(&cli.overrides())?;

    let control_plane = KubeControlPlane::connect(config.connect_options())
        .await
        .context("Failed to connect to the control plane")?;

    let collector = SnapshotCollector::new(Arc::new(control_plane), config.target())
        .with_query_timeout(config.query_timeout());

    let mode = config.run_mode();
    let mut sink = ReportSink::new(tokio::io::stdout());
    if let Some(path) = config.log_file_for(mode) {
        sink = sink
            .with_log_file(&path)
            .await
            .with_context(|| format!("Failed to open report log {}", path.display()))?;
    }

    if let RunMode::Periodic { interval, .. } = mode {
        let log_file = sink
            .log_file()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        print_info(&format!(
            "Reporting every {}s to {} (Ctrl-C to stop)",
            interval.as_secs(),
            log_file
        ));
    }

    let mut invoker = Invoker::new(collector, cli.format.into(), sink);
    let summary = invoker
        .run(mode, shutdown_signal())
        .await
        .context("Report failed")?;

    if summary.failures > 0 && !summary.all_failed() {
        print_warning(&format!(
            "{} of {} report runs failed",
            summary.failures, summary.runs
        ));
    }

    Ok(summary)
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
