//! Core data models for usage reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource usage of one container, as reported by the metrics API
///
/// Quantities are kept verbatim (`10m`, `50Mi`) so the report shows exactly
/// what the control plane returned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub pod_name: String,
    pub container_name: String,
    pub cpu: String,
    pub memory: String,
}

impl ContainerUsage {
    pub fn new(
        pod_name: impl Into<String>,
        container_name: impl Into<String>,
        cpu: impl Into<String>,
        memory: impl Into<String>,
    ) -> Self {
        Self {
            pod_name: pod_name.into(),
            container_name: container_name.into(),
            cpu: cpu.into(),
            memory: memory.into(),
        }
    }
}

/// A condition reported on a horizontal pod autoscaler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalerCondition {
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Current vs. target value of one scaling metric (`cpu: 45%/50%`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTarget {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    pub target: String,
}

/// Replica counts and conditions of one scaling target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingStatus {
    pub name: String,
    /// `Kind/name` of the scaled workload
    pub target_ref: String,
    pub current_replicas: i32,
    pub desired_replicas: i32,
    pub min_replicas: i32,
    pub max_replicas: i32,
    pub metrics: Vec<MetricTarget>,
    pub conditions: Vec<ScalerCondition>,
}

/// Outcome of the scaler lookup for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScalingState {
    Found(ScalingStatus),
    NotFound { name: String },
}

impl ScalingState {
    pub fn is_found(&self) -> bool {
        matches!(self, ScalingState::Found(_))
    }
}

/// What a report run queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTarget {
    /// Label selector for pods (e.g. `app=guestbook`)
    pub selector: String,
    /// Name of the horizontal pod autoscaler
    pub scaler: String,
}

impl ReportTarget {
    pub fn new(selector: impl Into<String>, scaler: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            scaler: scaler.into(),
        }
    }
}

/// Point-in-time, read-only view used to build a single report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub taken_at: DateTime<Utc>,
    pub namespace: String,
    pub selector: String,
    /// Sorted by pod name, then container name
    pub pods: Vec<ContainerUsage>,
    pub scaling: ScalingState,
    pub pod_count: usize,
}

impl UsageSnapshot {
    /// Build a snapshot, normalizing pod row order
    pub fn new(
        taken_at: DateTime<Utc>,
        namespace: impl Into<String>,
        selector: impl Into<String>,
        mut pods: Vec<ContainerUsage>,
        scaling: ScalingState,
        pod_count: usize,
    ) -> Self {
        pods.sort();
        Self {
            taken_at,
            namespace: namespace.into(),
            selector: selector.into(),
            pods,
            scaling,
            pod_count,
        }
    }

    /// Number of distinct pods that reported metrics
    pub fn pods_with_metrics(&self) -> usize {
        let mut names: Vec<&str> = self.pods.iter().map(|p| p.pod_name.as_str()).collect();
        names.dedup();
        names.len()
    }
}
