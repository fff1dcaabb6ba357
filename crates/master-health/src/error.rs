//! Error types for cluster queries, fetches, probes and whole runs.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::endpoint::EndpointError;

/// A single call to the cluster query capability failed.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Kubernetes API request failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Request did not complete in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// A collection or object could not be retrieved, even after retrying.
#[derive(Debug, Error)]
#[error("Failed after {attempts} attempts. Last error: {source}")]
pub struct FetchError {
    pub attempts: u32,
    #[source]
    pub source: QueryError,
}

/// Why a probe could not produce a verdict from observed data.
///
/// These never cross a probe boundary; they become Error-level results.
#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The query worked but returned nothing that can be assessed.
    #[error("{0}")]
    AssessmentGap(String),

    #[error("Probe timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Probe panicked: {0}")]
    Panicked(String),
}

/// Failures that stop a run before any probe executes.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Configuration file could not be read or parsed
    #[error("Failed to load configuration from {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },

    /// Configuration values are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubeconfig could not be resolved
    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(String),

    /// Kubernetes client could not be built
    #[error("Failed to create Kubernetes client: {0}")]
    Client(#[source] kube::Error),

    /// API server did not answer the connectivity check
    #[error("Failed to connect to cluster: {0}")]
    Connectivity(#[source] kube::Error),

    /// HTTP client for the health endpoint could not be built
    #[error("Failed to create health endpoint client: {0}")]
    Endpoint(#[from] EndpointError),
}
