//! `ClusterOperator` resource (config.openshift.io/v1).

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ClusterOperator has an empty spec; everything of interest is in status.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(group = "config.openshift.io", version = "v1", kind = "ClusterOperator")]
#[kube(status = "ClusterOperatorStatus")]
pub struct ClusterOperatorSpec {}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
pub struct ClusterOperatorStatus {
    /// `None` when the operator never reported conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<OperatorCondition>>,
}

/// Standard operator condition: Available, Progressing, Degraded, Upgradeable.
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
pub struct OperatorCondition {
    #[serde(rename = "type")]
    pub type_: String,
    /// "True", "False" or "Unknown"
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperatorCondition {
    pub fn new(type_: &str, status: &str, message: Option<&str>) -> Self {
        Self {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: None,
            message: message.map(ToString::to_string),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

impl ClusterOperator {
    /// Reported conditions, or `None` if the operator has no status at all.
    pub fn conditions(&self) -> Option<&[OperatorCondition]> {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.as_deref())
    }

    /// Build an operator carrying the given conditions.
    pub fn with_conditions(name: &str, conditions: Vec<OperatorCondition>) -> Self {
        let mut operator = Self::new(name, ClusterOperatorSpec {});
        operator.status = Some(ClusterOperatorStatus {
            conditions: Some(conditions),
        });
        operator
    }
}
