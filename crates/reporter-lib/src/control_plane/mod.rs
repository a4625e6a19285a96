//! Read-only access to the orchestration control plane
//!
//! The reporter only ever lists and gets objects. `KubeControlPlane` talks to
//! a real Kubernetes API server; tests use an in-memory fake.

mod kubernetes;
mod pod_metrics;

#[cfg(test)]
pub(crate) mod fake;

pub use kubernetes::{KubeConnectOptions, KubeControlPlane};
pub use pod_metrics::{PodMetrics, PodMetricsContainer};

use crate::error::{QueryError, ScalerError};
use crate::models::{ContainerUsage, ScalingStatus};

pub use async_trait::async_trait;

/// Trait for control plane query implementations
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Namespace all queries are scoped to
    fn namespace(&self) -> &str;

    /// Per-container CPU/memory usage of pods matching `selector`.
    ///
    /// No matching pods is an empty result, not an error.
    async fn fetch_pod_metrics(&self, selector: &str) -> Result<Vec<ContainerUsage>, QueryError>;

    /// Replica counts and conditions of the named scaler
    async fn fetch_scaling_status(&self, scaler: &str) -> Result<ScalingStatus, ScalerError>;

    /// Number of pods matching `selector`
    async fn count_pods(&self, selector: &str) -> Result<usize, QueryError>;
}
