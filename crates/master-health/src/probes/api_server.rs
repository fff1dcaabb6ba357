//! API server probe: apiserver pod readiness plus the `/healthz` endpoint.
//!
//! The endpoint answer is folded in as a flag. A failed or slow endpoint
//! never hides the pod data.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};

use super::{object_name, ProbeContext};
use crate::cluster::ListQuery;
use crate::endpoint;
use crate::error::ProbeFailure;
use crate::report::{ProbeKind, ProbeOutcome};
use crate::status::StatusLevel;

pub const API_SERVER_NAMESPACE: &str = "openshift-kube-apiserver";
pub const API_SERVER_POD_LABEL: &str = "app=openshift-kube-apiserver";
/// Container whose status stands for the pod; sidecars are ignored.
pub const API_SERVER_CONTAINER: &str = "kube-apiserver";

/// Per-pod readiness record, taken from the `kube-apiserver` container or
/// the first container when there is none by that name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiServerPod {
    pub ready: bool,
    pub restarts: i32,
    pub phase: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApiServerHealth {
    pub ready_servers: usize,
    pub total_servers: usize,
    pub pods: BTreeMap<String, ApiServerPod>,
    pub endpoint_healthy: bool,
}

impl ApiServerHealth {
    /// Build the pod side of the record; `endpoint_healthy` starts false.
    pub fn from_pods(pods: &[Pod]) -> Self {
        let mut health = Self {
            total_servers: pods.len(),
            ..Self::default()
        };

        for pod in pods {
            let status = pod.status.as_ref();
            let containers = status
                .and_then(|status| status.container_statuses.as_deref())
                .unwrap_or_default();
            let server = containers
                .iter()
                .find(|c| c.name == API_SERVER_CONTAINER)
                .or_else(|| containers.first());

            let record = ApiServerPod {
                ready: server.is_some_and(|c| c.ready),
                restarts: server.map_or(0, |c| c.restart_count),
                phase: status.and_then(|status| status.phase.clone()),
            };
            if record.ready {
                health.ready_servers += 1;
            }
            health
                .pods
                .insert(object_name(pod.metadata.name.as_ref()).to_string(), record);
        }

        health
    }

    /// No pods is a Warning (nothing to observe), no ready pod is
    /// Unhealthy, anything short of all-ready plus a healthy endpoint is a
    /// Warning.
    pub fn level(&self) -> StatusLevel {
        if self.total_servers == 0 {
            StatusLevel::Warning
        } else if self.ready_servers == 0 {
            StatusLevel::Unhealthy
        } else if self.ready_servers < self.total_servers || !self.endpoint_healthy {
            StatusLevel::Warning
        } else {
            StatusLevel::Healthy
        }
    }
}

#[instrument(skip_all, name = "api_server")]
pub async fn check(ctx: &ProbeContext<'_>) -> ProbeOutcome {
    let query = ListQuery::namespaced(API_SERVER_NAMESPACE).labels(API_SERVER_POD_LABEL);

    let pods = match ctx.fetcher.pods(&query).await {
        Ok(pods) => pods,
        Err(e) => {
            error!(error = %e, "Error checking API server health");
            return ProbeOutcome::failed(ProbeKind::ApiServer, &ProbeFailure::from(e));
        }
    };

    let mut health = ApiServerHealth::from_pods(&pods);
    health.endpoint_healthy = endpoint::is_healthy(ctx.endpoint).await;
    if !health.endpoint_healthy {
        warn!("API health endpoint is not responding");
    }

    ProbeOutcome::ApiServer(health)
}
