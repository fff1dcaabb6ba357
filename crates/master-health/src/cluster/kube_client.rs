//! kube-rs implementation of the cluster query capability.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Node, Pod};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::{ClusterOperator, ClusterQuery, ListQuery, Page};
use crate::config::HealthConfig;
use crate::error::{HealthError, QueryError};

/// Cluster access backed by a kube [`Client`].
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    cluster_url: String,
}

impl KubeCluster {
    /// Wrap an existing client.
    pub fn new(client: Client, cluster_url: impl Into<String>) -> Self {
        Self {
            client,
            cluster_url: cluster_url.into(),
        }
    }

    /// Build a client from an explicit kubeconfig, or from the environment
    /// (`KUBECONFIG`, `~/.kube/config`, in-cluster) when none is given.
    ///
    /// Every API request gets the configured connect/read timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the kubeconfig cannot be read or the client cannot be created.
    pub async fn connect(config: &HealthConfig) -> Result<Self, HealthError> {
        let options = KubeConfigOptions {
            context: config.context.clone(),
            ..KubeConfigOptions::default()
        };

        let mut kube_config = match (&config.kubeconfig, &config.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    HealthError::Kubeconfig(format!("failed to read {}: {e}", path.display()))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| HealthError::Kubeconfig(e.to_string()))?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options)
                .await
                .map_err(|e| HealthError::Kubeconfig(e.to_string()))?,
            (None, None) => Config::infer()
                .await
                .map_err(|e| HealthError::Kubeconfig(e.to_string()))?,
        };

        let timeout = config.request_timeout();
        kube_config.connect_timeout = Some(timeout);
        kube_config.read_timeout = Some(timeout);
        if config.insecure_skip_tls_verify {
            kube_config.accept_invalid_certs = true;
        }

        let cluster_url = kube_config.cluster_url.to_string();
        let client = Client::try_from(kube_config).map_err(HealthError::Client)?;

        debug!(cluster_url = %cluster_url, "Created Kubernetes client");
        Ok(Self::new(client, cluster_url))
    }

    /// Confirm the API server answers before any probe runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the API server cannot be reached.
    pub async fn verify(&self) -> Result<(), HealthError> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(HealthError::Connectivity)?;

        info!(
            cluster_url = %self.cluster_url,
            version = %version.git_version,
            "Successfully connected to cluster"
        );
        Ok(())
    }

    /// `/healthz` on the API server this client talks to.
    pub fn health_url(&self) -> String {
        format!("{}/healthz", self.cluster_url.trim_end_matches('/'))
    }

    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

fn list_params(query: &ListQuery, continue_token: Option<String>) -> ListParams {
    let mut params = ListParams::default().limit(query.page_size);
    if let Some(labels) = &query.label_selector {
        params = params.labels(labels);
    }
    if let Some(fields) = &query.field_selector {
        params = params.fields(fields);
    }
    if let Some(token) = continue_token {
        params = params.continue_token(&token);
    }
    params
}

async fn list_page<K>(
    api: Api<K>,
    query: &ListQuery,
    continue_token: Option<String>,
) -> Result<Page<K>, QueryError>
where
    K: Clone + DeserializeOwned + Debug,
{
    let list = api.list(&list_params(query, continue_token)).await?;
    Ok(Page {
        items: list.items,
        continue_token: list.metadata.continue_,
    })
}

#[async_trait]
impl ClusterQuery for KubeCluster {
    #[instrument(skip(self), level = "debug")]
    async fn list_nodes(
        &self,
        query: &ListQuery,
        continue_token: Option<String>,
    ) -> Result<Page<Node>, QueryError> {
        list_page(Api::all(self.client.clone()), query, continue_token).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_pods(
        &self,
        query: &ListQuery,
        continue_token: Option<String>,
    ) -> Result<Page<Pod>, QueryError> {
        let api = self.scoped(query.namespace.as_deref());
        list_page(api, query, continue_token).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_config_maps(
        &self,
        query: &ListQuery,
        continue_token: Option<String>,
    ) -> Result<Page<ConfigMap>, QueryError> {
        let api = self.scoped(query.namespace.as_deref());
        list_page(api, query, continue_token).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_cluster_operators(
        &self,
        query: &ListQuery,
        continue_token: Option<String>,
    ) -> Result<Page<ClusterOperator>, QueryError> {
        list_page(Api::all(self.client.clone()), query, continue_token).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_cluster_operator(
        &self,
        name: &str,
    ) -> Result<Option<ClusterOperator>, QueryError> {
        let api: Api<ClusterOperator> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }
}
