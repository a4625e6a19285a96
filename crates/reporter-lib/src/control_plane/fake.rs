//! In-memory control plane for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ControlPlane;
use crate::error::{QueryError, ScalerError};
use crate::models::{ContainerUsage, ScalingStatus};

/// How a fake query behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    Answer,
    Unreachable,
    MetricsMissing,
    Hang,
}

pub(crate) struct FakeControlPlane {
    pub namespace: String,
    pub selector: String,
    pub usage: Vec<ContainerUsage>,
    pub scalers: Vec<ScalingStatus>,
    pub pod_count: usize,
    pub metrics_behavior: Behavior,
    pub scaler_behavior: Behavior,
    pub count_behavior: Behavior,
    queries: AtomicUsize,
}

impl FakeControlPlane {
    pub fn new(selector: &str) -> Self {
        Self {
            namespace: "default".to_string(),
            selector: selector.to_string(),
            usage: Vec::new(),
            scalers: Vec::new(),
            pod_count: 0,
            metrics_behavior: Behavior::Answer,
            scaler_behavior: Behavior::Answer,
            count_behavior: Behavior::Answer,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn with_usage(mut self, usage: Vec<ContainerUsage>, pod_count: usize) -> Self {
        self.usage = usage;
        self.pod_count = pod_count;
        self
    }

    pub fn with_scaler(mut self, scaler: ScalingStatus) -> Self {
        self.scalers.push(scaler);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    async fn behave(&self, behavior: Behavior) -> Result<(), QueryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match behavior {
            Behavior::Answer => Ok(()),
            Behavior::Unreachable => Err(QueryError::Unreachable(
                "connection refused".to_string(),
            )),
            Behavior::MetricsMissing => Err(QueryError::MetricsUnavailable(
                "the server could not find the requested resource".to_string(),
            )),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn fetch_pod_metrics(&self, selector: &str) -> Result<Vec<ContainerUsage>, QueryError> {
        self.behave(self.metrics_behavior).await?;
        if selector != self.selector {
            return Ok(Vec::new());
        }
        Ok(self.usage.clone())
    }

    async fn fetch_scaling_status(&self, scaler: &str) -> Result<ScalingStatus, ScalerError> {
        self.behave(self.scaler_behavior).await?;
        self.scalers
            .iter()
            .find(|s| s.name == scaler)
            .cloned()
            .ok_or_else(|| ScalerError::NotFound {
                namespace: self.namespace.clone(),
                name: scaler.to_string(),
            })
    }

    async fn count_pods(&self, selector: &str) -> Result<usize, QueryError> {
        self.behave(self.count_behavior).await?;
        if selector != self.selector {
            return Ok(0);
        }
        Ok(self.pod_count)
    }
}
