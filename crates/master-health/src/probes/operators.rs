//! Critical Operators probe: conditions of every cluster operator.

use tracing::{error, instrument, warn};

use super::{object_name, ProbeContext};
use crate::cluster::{ClusterOperator, ListQuery};
use crate::error::ProbeFailure;
use crate::report::{ProbeKind, ProbeOutcome};
use crate::status::{EntityStatus, StatusLevel};

#[instrument(skip_all, name = "operators")]
pub async fn check(ctx: &ProbeContext<'_>) -> ProbeOutcome {
    match ctx.fetcher.cluster_operators(&ListQuery::cluster_wide()).await {
        Ok(operators) if operators.is_empty() => {
            warn!("No cluster operators found");
            ProbeOutcome::Entities(vec![EntityStatus::placeholder(
                "no-cluster-operators",
                "No cluster operators found",
            )])
        }
        Ok(operators) => ProbeOutcome::Entities(operators.iter().map(operator_status).collect()),
        Err(e) => {
            error!(error = %e, "Error checking critical operators");
            ProbeOutcome::failed(ProbeKind::Operators, &ProbeFailure::from(e))
        }
    }
}

/// Verdict for one operator.
///
/// `Degraded=True` and `Available!=True` are Unhealthy, `Progressing=True`
/// is a Warning. Every message that fires lands in `issues`, in condition
/// order, even when a more severe one is also present.
pub fn operator_status(operator: &ClusterOperator) -> EntityStatus {
    let mut status = EntityStatus::healthy(object_name(operator.metadata.name.as_ref()));

    let Some(conditions) = operator.conditions() else {
        status.issue(StatusLevel::Warning, "Operator has not reported any conditions");
        return status;
    };

    for condition in conditions {
        let message = condition.message.as_deref();
        match condition.type_.as_str() {
            "Degraded" if condition.is_true() => status.issue(
                StatusLevel::Unhealthy,
                message.unwrap_or("Operator is degraded"),
            ),
            "Progressing" if condition.is_true() => status.issue(
                StatusLevel::Warning,
                format!("Operator is progressing: {}", message.unwrap_or("no message")),
            ),
            "Available" if !condition.is_true() => status.issue(
                StatusLevel::Unhealthy,
                format!("Operator not available: {}", message.unwrap_or("no message")),
            ),
            _ => {}
        }
    }

    status
}
