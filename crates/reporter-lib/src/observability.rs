//! Observability infrastructure for the reporter
//!
//! Provides:
//! - tracing subscriber setup (stderr, plain or JSON)
//! - structured run events

use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

use crate::error::RunError;
use crate::models::UsageSnapshot;

/// Install the global tracing subscriber.
///
/// Logs go to stderr so stdout carries only reports. `RUST_LOG` overrides the
/// default level.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), TryInitError> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .try_init()
}

/// Structured logger for report runs
#[derive(Debug, Clone)]
pub struct RunLogger {
    namespace: String,
    selector: String,
}

impl RunLogger {
    pub fn new(namespace: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            selector: selector.into(),
        }
    }

    /// Log the start of a run
    pub fn log_started(&self, run: u64) {
        info!(
            event = "report_started",
            namespace = %self.namespace,
            selector = %self.selector,
            run = run,
            "Collecting usage snapshot"
        );
    }

    /// Log a completed run
    pub fn log_completed(&self, run: u64, snapshot: &UsageSnapshot, elapsed: Duration) {
        info!(
            event = "report_completed",
            namespace = %self.namespace,
            selector = %self.selector,
            run = run,
            pods = snapshot.pods_with_metrics(),
            pod_count = snapshot.pod_count,
            scaler_found = snapshot.scaling.is_found(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Report written"
        );
    }

    /// Log a failed run
    pub fn log_failed(&self, run: u64, error: &RunError) {
        warn!(
            event = "report_failed",
            namespace = %self.namespace,
            selector = %self.selector,
            run = run,
            error = %error,
            "Report run failed"
        );
    }

    /// Log the end of periodic reporting
    pub fn log_shutdown(&self, runs: u64, failures: u64, reason: &str) {
        info!(
            event = "reporter_shutdown",
            namespace = %self.namespace,
            selector = %self.selector,
            runs = runs,
            failures = failures,
            reason = %reason,
            "Periodic reporting stopped"
        );
    }
}
