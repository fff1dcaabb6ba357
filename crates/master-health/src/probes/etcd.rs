//! etcd probe.
//!
//! Stage one asks the `etcd` cluster operator; a Degraded or unavailable
//! operator settles the verdict. Otherwise, or when the operator cannot be
//! read, stage two inspects the etcd pods themselves.

use k8s_openapi::api::core::v1::Pod;
use tracing::{error, instrument, warn};

use super::{object_name, pod_status, ProbeContext};
use crate::cluster::{ClusterOperator, ListQuery};
use crate::error::ProbeFailure;
use crate::report::ProbeOutcome;
use crate::status::{StatusLevel, SubsystemStatus};

pub const ETCD_OPERATOR: &str = "etcd";
pub const ETCD_NAMESPACE: &str = "openshift-etcd";
pub const ETCD_POD_LABEL: &str = "app=etcd";

#[instrument(skip_all, name = "etcd")]
pub async fn check(ctx: &ProbeContext<'_>) -> ProbeOutcome {
    let mut notes = Vec::new();
    let mut status = match assess(ctx, &mut notes).await {
        Ok(status) => status,
        Err(failure) => {
            error!(error = %failure, "Error checking etcd health");
            SubsystemStatus::error(failure.to_string())
        }
    };
    for note in notes {
        status.warning(note);
    }
    ProbeOutcome::Subsystem(status)
}

/// `notes` collects why stage one could not decide; they are reported as
/// warnings whatever stage two concludes.
async fn assess(
    ctx: &ProbeContext<'_>,
    notes: &mut Vec<String>,
) -> Result<SubsystemStatus, ProbeFailure> {
    match ctx.fetcher.cluster_operator(ETCD_OPERATOR).await {
        Ok(Some(operator)) => {
            if let Some(verdict) = operator_verdict(&operator) {
                return Ok(verdict);
            }
        }
        Ok(None) => {
            warn!("etcd cluster operator not found, checking pods directly");
            notes.push("Unable to find etcd operator".to_string());
        }
        Err(e) => {
            warn!(error = %e, "etcd cluster operator unavailable, checking pods directly");
            notes.push(format!("Unable to query etcd operator: {e}"));
        }
    }

    let query = ListQuery::namespaced(ETCD_NAMESPACE).labels(ETCD_POD_LABEL);
    let pods = ctx.fetcher.pods(&query).await?;
    if pods.is_empty() {
        return Err(ProbeFailure::AssessmentGap("No etcd pods found".to_string()));
    }

    let problems = pod_problems(&pods);
    if problems.is_empty() {
        return Ok(SubsystemStatus::healthy("All etcd pods are running and ready"));
    }
    Ok(SubsystemStatus::with_issues(
        StatusLevel::Unhealthy,
        format!("{} etcd pod problem(s)", problems.len()),
        problems,
    ))
}

/// Stage one: the first Degraded=True or Available!=True condition decides.
pub fn operator_verdict(operator: &ClusterOperator) -> Option<SubsystemStatus> {
    operator.conditions()?.iter().find_map(|condition| {
        let message = condition.message.as_deref().unwrap_or("no message");
        match condition.type_.as_str() {
            "Degraded" if condition.is_true() => Some(SubsystemStatus::with_issues(
                StatusLevel::Unhealthy,
                "etcd operator is degraded",
                vec![message.to_string()],
            )),
            "Available" if !condition.is_true() => Some(SubsystemStatus::with_issues(
                StatusLevel::Unhealthy,
                "etcd operator is not available",
                vec![format!("etcd operator not available: {message}")],
            )),
            _ => None,
        }
    })
}

/// One line per problem, prefixed with the pod name.
fn pod_problems(pods: &[Pod]) -> Vec<String> {
    pods.iter()
        .flat_map(|pod| {
            let name = object_name(pod.metadata.name.as_ref()).to_string();
            pod_status(pod)
                .issues
                .into_iter()
                .map(move |issue| format!("{name}: {issue}"))
        })
        .collect()
}
