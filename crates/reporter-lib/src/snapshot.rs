//! Snapshot collection
//!
//! Runs the three control plane queries one after another, each bounded by
//! the query timeout, and assembles a [`UsageSnapshot`]. A missing scaler is
//! recorded in the snapshot; every other failure aborts the collection.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::control_plane::ControlPlane;
use crate::error::{QueryError, ScalerError};
use crate::models::{ReportTarget, ScalingState, UsageSnapshot};

/// Default bound on a single control plane query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Collects usage snapshots for one report target
pub struct SnapshotCollector {
    control_plane: Arc<dyn ControlPlane>,
    target: ReportTarget,
    query_timeout: Duration,
}

impl SnapshotCollector {
    pub fn new(control_plane: Arc<dyn ControlPlane>, target: ReportTarget) -> Self {
        Self {
            control_plane,
            target,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn target(&self) -> &ReportTarget {
        &self.target
    }

    pub fn namespace(&self) -> &str {
        self.control_plane.namespace()
    }

    /// Take one snapshot
    pub async fn collect(&self) -> Result<UsageSnapshot, QueryError> {
        let taken_at = Utc::now();
        let selector = self.target.selector.as_str();

        let pods = self
            .bounded(
                "pod metrics query",
                self.control_plane.fetch_pod_metrics(selector),
            )
            .await??;

        let scaling = match self
            .bounded(
                "scaler status query",
                self.control_plane.fetch_scaling_status(&self.target.scaler),
            )
            .await?
        {
            Ok(status) => ScalingState::Found(status),
            Err(ScalerError::NotFound { namespace, name }) => {
                warn!(namespace = %namespace, scaler = %name, "Scaler not found");
                ScalingState::NotFound { name }
            }
            Err(ScalerError::Query(e)) => return Err(e),
        };

        let pod_count = self
            .bounded("pod count query", self.control_plane.count_pods(selector))
            .await??;

        debug!(
            containers = pods.len(),
            pod_count = pod_count,
            scaler_found = scaling.is_found(),
            "Snapshot collected"
        );

        Ok(UsageSnapshot::new(
            taken_at,
            self.control_plane.namespace(),
            selector,
            pods,
            scaling,
            pod_count,
        ))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        query: impl Future<Output = T>,
    ) -> Result<T, QueryError> {
        tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| QueryError::Timeout {
                operation,
                timeout: self.query_timeout,
            })
    }
}
