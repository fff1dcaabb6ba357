//! Master Nodes probe: node conditions on every master-role node.

use k8s_openapi::api::core::v1::Node;
use tracing::{error, instrument, warn};

use super::{object_name, ProbeContext};
use crate::cluster::ListQuery;
use crate::error::ProbeFailure;
use crate::report::{ProbeKind, ProbeOutcome};
use crate::status::{EntityStatus, StatusLevel};

pub const MASTER_ROLE_LABEL: &str = "node-role.kubernetes.io/master";

/// Node conditions that only warn when true.
const PRESSURE_CONDITIONS: [&str; 3] = ["DiskPressure", "MemoryPressure", "PIDPressure"];

#[instrument(skip_all, name = "master_nodes")]
pub async fn check(ctx: &ProbeContext<'_>) -> ProbeOutcome {
    let query = ListQuery::cluster_wide().labels(MASTER_ROLE_LABEL);

    match ctx.fetcher.nodes(&query).await {
        Ok(nodes) if nodes.is_empty() => {
            warn!("No master nodes found");
            ProbeOutcome::Entities(vec![EntityStatus::placeholder(
                "no-master-nodes",
                "No master nodes found",
            )])
        }
        Ok(nodes) => ProbeOutcome::Entities(nodes.iter().map(node_status).collect()),
        Err(e) => {
            error!(error = %e, "Error checking master nodes");
            ProbeOutcome::failed(ProbeKind::MasterNodes, &ProbeFailure::from(e))
        }
    }
}

/// Verdict for one node from its condition list.
///
/// `Ready` other than `True` is Unhealthy; any pressure condition that is
/// `True` is a Warning. Everything that fires is kept.
pub fn node_status(node: &Node) -> EntityStatus {
    let mut status = EntityStatus::healthy(object_name(node.metadata.name.as_ref()));

    let Some(conditions) = node
        .status
        .as_ref()
        .and_then(|node_status| node_status.conditions.as_ref())
    else {
        status.issue(StatusLevel::Error, "Node reports no conditions");
        return status;
    };

    for condition in conditions {
        let message = condition.message.as_deref().unwrap_or("no message");
        if condition.type_ == "Ready" {
            if condition.status != "True" {
                status.issue(
                    StatusLevel::Unhealthy,
                    format!("Node not ready: {message}"),
                );
            }
        } else if PRESSURE_CONDITIONS.contains(&condition.type_.as_str())
            && condition.status == "True"
        {
            status.warning(format!("{}: {message}", condition.type_));
        }
    }

    status
}
