//! Control Plane Pods probe.
//!
//! Lists every pod in the fixed control plane namespaces and keeps the ones
//! whose names mark them as control plane components.

use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, error, instrument};

use super::{pod_status, ProbeContext};
use crate::cluster::ListQuery;
use crate::report::ProbeOutcome;
use crate::status::EntityStatus;

pub const CONTROL_PLANE_NAMESPACES: [&str; 5] = [
    "openshift-etcd",
    "openshift-apiserver",
    "openshift-kube-apiserver",
    "openshift-kube-controller-manager",
    "openshift-kube-scheduler",
];

/// A pod is a control plane pod if its name contains one of these.
pub const CONTROL_PLANE_COMPONENTS: [&str; 4] =
    ["etcd", "apiserver", "controller-manager", "scheduler"];

#[instrument(skip_all, name = "control_plane")]
pub async fn check(ctx: &ProbeContext<'_>) -> ProbeOutcome {
    let mut results = Vec::new();

    for namespace in CONTROL_PLANE_NAMESPACES {
        match ctx.fetcher.pods(&ListQuery::namespaced(namespace)).await {
            Ok(pods) => {
                debug!(namespace, pods = pods.len(), "Listed namespace pods");
                results.extend(namespace_statuses(namespace, &pods));
            }
            Err(e) => {
                error!(namespace, error = %e, "Error listing control plane pods");
                results.push(
                    EntityStatus::error(format!("pods-in-{namespace}"), e.to_string())
                        .in_namespace(namespace),
                );
            }
        }
    }

    ProbeOutcome::Entities(results)
}

pub fn is_control_plane_pod(name: &str) -> bool {
    CONTROL_PLANE_COMPONENTS
        .iter()
        .any(|component| name.contains(component))
}

/// Statuses for one namespace, with a placeholder when it has no pods at
/// all or no control plane pods.
pub fn namespace_statuses(namespace: &str, pods: &[Pod]) -> Vec<EntityStatus> {
    if pods.is_empty() {
        return vec![EntityStatus::placeholder(
            format!("no-pods-in-{namespace}"),
            format!("No pods found in namespace {namespace}"),
        )
        .in_namespace(namespace)];
    }

    let statuses: Vec<_> = pods
        .iter()
        .filter(|pod| {
            pod.metadata
                .name
                .as_deref()
                .is_some_and(is_control_plane_pod)
        })
        .map(|pod| pod_status(pod).in_namespace(namespace))
        .collect();

    if statuses.is_empty() {
        return vec![EntityStatus::placeholder(
            format!("no-control-plane-pods-in-{namespace}"),
            format!("No control plane pods found in namespace {namespace}"),
        )
        .in_namespace(namespace)];
    }

    statuses
}
