//! Cluster query capability.
//!
//! Probes only see the [`ClusterQuery`] trait: paged listing of typed
//! collections and single-object lookups. [`KubeCluster`] implements it over
//! kube-rs.

mod kube_client;
mod operator;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Node, Pod};

#[cfg(test)]
use mockall::automock;

use crate::error::QueryError;

pub use kube_client::KubeCluster;
pub use operator::{ClusterOperator, ClusterOperatorSpec, ClusterOperatorStatus, OperatorCondition};

/// Largest page ever requested from the API server.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Describes one collection listing: scope, selectors and page size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub namespace: Option<String>,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    pub page_size: u32,
}

impl ListQuery {
    /// All objects of a kind, across namespaces.
    #[must_use]
    pub fn cluster_wide() -> Self {
        Self {
            namespace: None,
            label_selector: None,
            field_selector: None,
            page_size: MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn namespaced(namespace: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            ..Self::cluster_wide()
        }
    }

    #[must_use]
    pub fn labels(mut self, selector: &str) -> Self {
        self.label_selector = Some(selector.to_string());
        self
    }

    #[must_use]
    pub fn fields(mut self, selector: &str) -> Self {
        self.field_selector = Some(selector.to_string());
        self
    }

    /// Set the page size, clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

/// One page of a listing plus the server's continuation token.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub continue_token: Option<String>,
}

impl<T> Page<T> {
    /// Final page: no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            continue_token: None,
        }
    }

    pub fn with_continue(items: Vec<T>, token: impl Into<String>) -> Self {
        Self {
            items,
            continue_token: Some(token.into()),
        }
    }

    /// Token for the next page. Missing or blank tokens end the listing.
    pub fn next_token(&self) -> Option<&str> {
        self.continue_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Read-only access to the cluster objects the probes need.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    async fn list_nodes(
        &self,
        query: &ListQuery,
        continue_token: Option<String>,
    ) -> Result<Page<Node>, QueryError>;

    async fn list_pods(
        &self,
        query: &ListQuery,
        continue_token: Option<String>,
    ) -> Result<Page<Pod>, QueryError>;

    async fn list_config_maps(
        &self,
        query: &ListQuery,
        continue_token: Option<String>,
    ) -> Result<Page<ConfigMap>, QueryError>;

    async fn list_cluster_operators(
        &self,
        query: &ListQuery,
        continue_token: Option<String>,
    ) -> Result<Page<ClusterOperator>, QueryError>;

    /// Look up one cluster operator; `Ok(None)` when it does not exist.
    async fn get_cluster_operator(&self, name: &str)
        -> Result<Option<ClusterOperator>, QueryError>;
}
