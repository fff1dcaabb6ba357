//! Health probes.
//!
//! Each probe reads what it needs through a [`ProbeContext`] and always
//! returns a [`ProbeOutcome`](crate::report::ProbeOutcome): fetch failures and missing data are turned
//! into Error-level results inside the probe and never escape it.

pub mod api_server;
pub mod certificates;
pub mod control_plane;
pub mod etcd;
pub mod master_nodes;
pub mod operators;

use k8s_openapi::api::core::v1::Pod;

use crate::endpoint::EndpointCheck;
use crate::fetch::Fetcher;
use crate::status::{EntityStatus, StatusLevel};

pub use api_server::{ApiServerHealth, ApiServerPod};

/// Everything a probe may use: the fetcher and the endpoint check.
#[derive(Clone, Copy)]
pub struct ProbeContext<'a> {
    pub fetcher: Fetcher<'a>,
    pub endpoint: &'a dyn EndpointCheck,
}

impl<'a> ProbeContext<'a> {
    pub fn new(fetcher: Fetcher<'a>, endpoint: &'a dyn EndpointCheck) -> Self {
        Self { fetcher, endpoint }
    }
}

pub(crate) fn object_name(name: Option<&String>) -> &str {
    name.map_or("unknown", String::as_str)
}

/// Phase and container readiness verdict for one pod.
///
/// A pod that is not `Running` is Unhealthy; a running pod is Unhealthy for
/// every container that is not ready. A pod without any status is Error.
pub fn pod_status(pod: &Pod) -> EntityStatus {
    let mut status = EntityStatus::healthy(object_name(pod.metadata.name.as_ref()));

    let Some(pod_status) = pod.status.as_ref() else {
        status.issue(StatusLevel::Error, "Unable to get pod status");
        return status;
    };

    match pod_status.phase.as_deref() {
        Some("Running") => {
            for container in pod_status.container_statuses.iter().flatten() {
                if !container.ready {
                    status.issue(
                        StatusLevel::Unhealthy,
                        format!("Container {} not ready", container.name),
                    );
                }
            }
        }
        phase => status.issue(
            StatusLevel::Unhealthy,
            format!("Pod not running: {}", phase.unwrap_or("Unknown")),
        ),
    }

    status
}
