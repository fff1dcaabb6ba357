//! OpenShift control plane health diagnostics.
//!
//! Runs a fixed set of read-only probes against a cluster (master nodes,
//! etcd, the API server, cluster operators, control plane pods and
//! certificates) and merges their verdicts into one [`HealthReport`].
//! Nothing in this crate writes to the cluster.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use master_health::{HealthChecker, HealthConfig, HttpEndpointCheck, KubeCluster};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HealthConfig::default();
//!     let cluster = KubeCluster::connect(&config).await?;
//!     let endpoint = HttpEndpointCheck::new(cluster.health_url(), config.endpoint_timeout(), false)?;
//!     let checker = HealthChecker::new(Arc::new(cluster), Arc::new(endpoint), config.check_options());
//!     let report = checker.run(chrono::Utc::now()).await;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod cluster;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod probes;
pub mod render;
pub mod report;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types at the crate root
pub use cluster::{ClusterOperator, ClusterQuery, KubeCluster, ListQuery, Page};
pub use config::HealthConfig;
pub use endpoint::{EndpointCheck, HttpEndpointCheck};
pub use error::{FetchError, HealthError, ProbeFailure, QueryError};
pub use fetch::{Fetcher, RetryPolicy};
pub use render::{OutputFormat, Renderer};
pub use report::{CheckOptions, HealthChecker, HealthReport, ProbeKind, ProbeOutcome, ProbeResult};
pub use status::{EntityStatus, StatusLevel, SubsystemStatus};
