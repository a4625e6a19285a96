//! Kubernetes-backed control plane
//!
//! Queries are scoped to one namespace and limited to `list`/`get`:
//! - pod metrics from `metrics.k8s.io/v1beta1`
//! - horizontal pod autoscalers from `autoscaling/v2`
//! - pods from core/v1

use async_trait::async_trait;
use k8s_openapi::api::autoscaling::v2::{
    HorizontalPodAutoscaler, MetricSpec, MetricStatus, MetricTarget as TargetSpec,
    MetricValueStatus,
};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::PathBuf;
use tracing::debug;

use super::{ControlPlane, PodMetrics};
use crate::error::{QueryError, ScalerError};
use crate::models::{ContainerUsage, MetricTarget, ScalerCondition, ScalingStatus};

/// How to reach the API server
#[derive(Debug, Clone, Default)]
pub struct KubeConnectOptions {
    /// Explicit kubeconfig file; falls back to in-cluster or `~/.kube/config`
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one
    pub context: Option<String>,
    /// Namespace override; defaults to the kubeconfig namespace
    pub namespace: Option<String>,
}

/// Control plane client backed by the Kubernetes API
pub struct KubeControlPlane {
    client: Client,
    namespace: String,
}

impl KubeControlPlane {
    /// Build a client from the given options
    pub async fn connect(options: KubeConnectOptions) -> Result<Self, QueryError> {
        let client = build_client(&options).await?;
        let namespace = options
            .namespace
            .unwrap_or_else(|| client.default_namespace().to_string());

        debug!(namespace = %namespace, "Kubernetes client ready");
        Ok(Self::from_client(client, namespace))
    }

    /// Wrap an existing client
    pub fn from_client(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn fetch_pod_metrics(&self, selector: &str) -> Result<Vec<ContainerUsage>, QueryError> {
        let api: Api<PodMetrics> = Api::namespaced(self.client.clone(), &self.namespace);
        let params = ListParams::default().labels(selector);

        let list = api.list(&params).await.map_err(map_metrics_error)?;

        let usage: Vec<ContainerUsage> = list
            .items
            .into_iter()
            .flat_map(PodMetrics::into_usage)
            .collect();

        debug!(selector = %selector, containers = usage.len(), "Fetched pod metrics");
        Ok(usage)
    }

    async fn fetch_scaling_status(&self, scaler: &str) -> Result<ScalingStatus, ScalerError> {
        let api: Api<HorizontalPodAutoscaler> =
            Api::namespaced(self.client.clone(), &self.namespace);

        let hpa = api
            .get_opt(scaler)
            .await
            .map_err(|e| map_kube_error("get horizontal pod autoscaler", e))?
            .ok_or_else(|| ScalerError::NotFound {
                namespace: self.namespace.clone(),
                name: scaler.to_string(),
            })?;

        debug!(scaler = %scaler, "Fetched horizontal pod autoscaler");
        Ok(scaling_status_from(hpa))
    }

    async fn count_pods(&self, selector: &str) -> Result<usize, QueryError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let params = ListParams::default().labels(selector);

        // Only the count is needed, so skip pod specs and status
        let pods = api
            .list_metadata(&params)
            .await
            .map_err(|e| map_kube_error("list pods", e))?;

        debug!(selector = %selector, pods = pods.items.len(), "Listed pods");
        Ok(pods.items.len())
    }
}

async fn build_client(options: &KubeConnectOptions) -> Result<Client, QueryError> {
    let kube_options = KubeConfigOptions {
        context: options.context.clone(),
        ..Default::default()
    };

    let config = match &options.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                QueryError::Unreachable(format!(
                    "failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &kube_options)
                .await
                .map_err(|e| QueryError::Unreachable(format!("invalid kubeconfig: {}", e)))?
        }
        None if options.context.is_some() => Config::from_kubeconfig(&kube_options)
            .await
            .map_err(|e| QueryError::Unreachable(format!("invalid kubeconfig: {}", e)))?,
        None => Config::infer().await.map_err(|e| {
            QueryError::Unreachable(format!("no usable cluster configuration: {}", e))
        })?,
    };

    Client::try_from(config)
        .map_err(|e| QueryError::Unreachable(format!("failed to create client: {}", e)))
}

fn map_kube_error(operation: &'static str, err: kube::Error) -> QueryError {
    match err {
        kube::Error::Api(resp) => QueryError::Api {
            operation,
            code: resp.code,
            message: resp.message,
        },
        other => QueryError::Unreachable(other.to_string()),
    }
}

/// The aggregated metrics API answers 404 or 503 when metrics-server is
/// absent or not serving.
fn map_metrics_error(err: kube::Error) -> QueryError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 || resp.code == 503 => {
            QueryError::MetricsUnavailable(resp.message)
        }
        other => map_kube_error("list pod metrics", other),
    }
}

/// Convert an HPA object into the reporter's view of it
pub(crate) fn scaling_status_from(hpa: HorizontalPodAutoscaler) -> ScalingStatus {
    let name = hpa.metadata.name.unwrap_or_default();
    let spec = hpa.spec.unwrap_or_default();
    let status = hpa.status.unwrap_or_default();

    let current_metrics = status.current_metrics.unwrap_or_default();
    let metrics = spec
        .metrics
        .unwrap_or_default()
        .iter()
        .filter_map(|metric| {
            let (key, target) = spec_target(metric)?;
            let current = current_metrics
                .iter()
                .filter_map(status_value)
                .find(|(status_key, _)| *status_key == key)
                .and_then(|(_, value)| format_value(value));

            Some(MetricTarget {
                name: key,
                current,
                target: format_target(target),
            })
        })
        .collect();

    let conditions = status
        .conditions
        .unwrap_or_default()
        .into_iter()
        .map(|c| ScalerCondition {
            condition_type: c.type_,
            status: c.status,
            reason: c.reason,
            message: c.message,
        })
        .collect();

    ScalingStatus {
        name,
        target_ref: format!(
            "{}/{}",
            spec.scale_target_ref.kind, spec.scale_target_ref.name
        ),
        current_replicas: status.current_replicas.unwrap_or(0),
        desired_replicas: status.desired_replicas,
        // Kubernetes defaults minReplicas to 1
        min_replicas: spec.min_replicas.unwrap_or(1),
        max_replicas: spec.max_replicas,
        metrics,
        conditions,
    }
}

fn spec_target(metric: &MetricSpec) -> Option<(String, &TargetSpec)> {
    if let Some(resource) = &metric.resource {
        return Some((resource.name.clone(), &resource.target));
    }
    if let Some(resource) = &metric.container_resource {
        return Some((
            format!("{} ({})", resource.name, resource.container),
            &resource.target,
        ));
    }
    if let Some(pods) = &metric.pods {
        return Some((pods.metric.name.clone(), &pods.target));
    }
    if let Some(object) = &metric.object {
        return Some((object.metric.name.clone(), &object.target));
    }
    metric
        .external
        .as_ref()
        .map(|external| (external.metric.name.clone(), &external.target))
}

fn status_value(metric: &MetricStatus) -> Option<(String, &MetricValueStatus)> {
    if let Some(resource) = &metric.resource {
        return Some((resource.name.clone(), &resource.current));
    }
    if let Some(resource) = &metric.container_resource {
        return Some((
            format!("{} ({})", resource.name, resource.container),
            &resource.current,
        ));
    }
    if let Some(pods) = &metric.pods {
        return Some((pods.metric.name.clone(), &pods.current));
    }
    if let Some(object) = &metric.object {
        return Some((object.metric.name.clone(), &object.current));
    }
    metric
        .external
        .as_ref()
        .map(|external| (external.metric.name.clone(), &external.current))
}

fn format_target(target: &TargetSpec) -> String {
    if let Some(utilization) = target.average_utilization {
        format!("{}%", utilization)
    } else if let Some(value) = &target.average_value {
        value.0.clone()
    } else if let Some(value) = &target.value {
        value.0.clone()
    } else {
        "<unset>".to_string()
    }
}

fn format_value(value: &MetricValueStatus) -> Option<String> {
    if let Some(utilization) = value.average_utilization {
        Some(format!("{}%", utilization))
    } else if let Some(average) = &value.average_value {
        Some(average.0.clone())
    } else {
        value.value.as_ref().map(|v| v.0.clone())
    }
}
