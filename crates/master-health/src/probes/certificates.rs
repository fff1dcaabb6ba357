//! Certificate Expiry probe.
//!
//! Reads the certificate status configmaps and flags every value that
//! mentions expiry. The values are free-form text, so this is a substring
//! heuristic: it will miss wording it does not know and can flag text that
//! merely mentions the words. Treat a Warning here as a prompt to look, not
//! as proof.

use k8s_openapi::api::core::v1::ConfigMap;
use tracing::{debug, error, instrument};

use super::ProbeContext;
use crate::cluster::ListQuery;
use crate::error::ProbeFailure;
use crate::report::ProbeOutcome;
use crate::status::{StatusLevel, SubsystemStatus};

pub const CERT_NAMESPACE: &str = "openshift-config-managed";
pub const CERT_LABEL: &str = "config.openshift.io/component=Certificates";

const EXPIRY_MARKERS: [&str; 2] = ["expiring", "expired"];

#[instrument(skip_all, name = "certificates")]
pub async fn check(ctx: &ProbeContext<'_>) -> ProbeOutcome {
    let status = match assess(ctx).await {
        Ok(status) => status,
        Err(failure) => {
            error!(error = %failure, "Error checking certificates");
            SubsystemStatus::error(failure.to_string())
        }
    };
    ProbeOutcome::Subsystem(status)
}

async fn assess(ctx: &ProbeContext<'_>) -> Result<SubsystemStatus, ProbeFailure> {
    let query = ListQuery::namespaced(CERT_NAMESPACE).labels(CERT_LABEL);
    let config_maps = ctx.fetcher.config_maps(&query).await?;
    if config_maps.is_empty() {
        return Err(ProbeFailure::AssessmentGap(
            "Certificate status configmap not found".to_string(),
        ));
    }

    debug!(config_maps = config_maps.len(), "Scanning certificate status");
    let flagged = flagged_certificates(&config_maps);
    if flagged.is_empty() {
        return Ok(SubsystemStatus::healthy("All certificates are valid"));
    }

    Ok(SubsystemStatus::with_issues(
        StatusLevel::Warning,
        format!("{} certificate(s) expiring or expired", flagged.len()),
        flagged,
    ))
}

pub fn mentions_expiry(value: &str) -> bool {
    let value = value.to_lowercase();
    EXPIRY_MARKERS.iter().any(|marker| value.contains(marker))
}

/// One message per flagged key, across all configmaps in list order.
pub fn flagged_certificates(config_maps: &[ConfigMap]) -> Vec<String> {
    config_maps
        .iter()
        .filter_map(|config_map| config_map.data.as_ref())
        .flatten()
        .filter(|(_, value)| mentions_expiry(value))
        .map(|(name, value)| format!("Certificate {name} is {value}"))
        .collect()
}
