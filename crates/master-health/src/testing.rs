//! Object builders shared by unit tests.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMap, ContainerStatus, Node, NodeCondition, NodeStatus, Pod, PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::cluster::{ClusterOperator, OperatorCondition};
use crate::endpoint::MockEndpointCheck;

pub fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..ObjectMeta::default()
    }
}

pub fn condition(type_: &str, status: &str, message: &str) -> NodeCondition {
    NodeCondition {
        type_: type_.to_string(),
        status: status.to_string(),
        message: Some(message.to_string()),
        ..NodeCondition::default()
    }
}

pub fn node(name: &str, conditions: Vec<NodeCondition>) -> Node {
    Node {
        metadata: meta(name),
        status: Some(NodeStatus {
            conditions: Some(conditions),
            ..NodeStatus::default()
        }),
        ..Node::default()
    }
}

pub fn container(name: &str, ready: bool, restarts: i32) -> ContainerStatus {
    ContainerStatus {
        name: name.to_string(),
        ready,
        restart_count: restarts,
        ..ContainerStatus::default()
    }
}

pub fn pod(name: &str, phase: &str, containers: Vec<ContainerStatus>) -> Pod {
    Pod {
        metadata: meta(name),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: Some(containers),
            ..PodStatus::default()
        }),
        ..Pod::default()
    }
}

pub fn running_pod(name: &str) -> Pod {
    pod(name, "Running", vec![container("main", true, 0)])
}

pub fn config_map(name: &str, data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: meta(name),
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..ConfigMap::default()
    }
}

pub fn operator(name: &str, conditions: &[(&str, &str, &str)]) -> ClusterOperator {
    ClusterOperator::with_conditions(
        name,
        conditions
            .iter()
            .map(|(type_, status, message)| OperatorCondition::new(type_, status, Some(message)))
            .collect(),
    )
}

/// Endpoint check that must never be called.
pub fn unused_endpoint() -> MockEndpointCheck {
    let mut endpoint = MockEndpointCheck::new();
    endpoint.expect_status().never();
    endpoint
}
