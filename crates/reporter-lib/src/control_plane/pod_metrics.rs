//! `metrics.k8s.io/v1beta1` PodMetrics, which k8s-openapi does not ship

use k8s_openapi::apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::ContainerUsage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetricsContainer {
    pub name: String,
    /// Keyed by resource name (`cpu`, `memory`)
    #[serde(default)]
    pub usage: BTreeMap<String, Quantity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub containers: Vec<PodMetricsContainer>,
}

impl k8s_openapi::Resource for PodMetrics {
    type Scope = k8s_openapi::NamespaceResourceScope;

    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "PodMetrics";
    const URL_PATH_SEGMENT: &'static str = "pods";
    const VERSION: &'static str = "v1beta1";
}

impl k8s_openapi::Metadata for PodMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

impl PodMetrics {
    /// Flatten into one usage row per container
    pub fn into_usage(self) -> Vec<ContainerUsage> {
        let pod_name = self.metadata.name.unwrap_or_default();

        self.containers
            .into_iter()
            .map(|container| {
                let cpu = usage_value(&container.usage, "cpu");
                let memory = usage_value(&container.usage, "memory");
                ContainerUsage::new(pod_name.clone(), container.name, cpu, memory)
            })
            .collect()
    }
}

fn usage_value(usage: &BTreeMap<String, Quantity>, resource: &str) -> String {
    usage
        .get(resource)
        .map(|q| q.0.clone())
        .unwrap_or_else(|| "<unknown>".to_string())
}
