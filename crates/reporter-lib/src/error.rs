//! Error types for control plane queries

use std::time::Duration;
use thiserror::Error;

/// A query against the control plane could not be answered
///
/// Any of these aborts a report run.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("control plane unreachable: {0}")]
    Unreachable(String),

    #[error("metrics API is not available (is metrics-server installed?): {0}")]
    MetricsUnavailable(String),

    #[error("control plane rejected {operation} ({code}): {message}")]
    Api {
        operation: &'static str,
        code: u16,
        message: String,
    },

    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

/// Failure looking up a named scaler
#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("horizontal pod autoscaler {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Failure of a single report run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),

    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}
