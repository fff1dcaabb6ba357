//! Report Aggregator.
//!
//! [`HealthChecker`] runs every probe against one cluster and one timestamp
//! and collects the outcomes into a [`HealthReport`]. Probes are isolated
//! from each other: a probe that fails, panics or runs past the deadline is
//! reported as Error and the rest carry on.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{stream, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cluster::{ClusterQuery, MAX_PAGE_SIZE};
use crate::endpoint::EndpointCheck;
use crate::error::ProbeFailure;
use crate::fetch::{Fetcher, RetryPolicy};
use crate::probes::{
    api_server, certificates, control_plane, etcd, master_nodes, operators, ApiServerHealth,
    ProbeContext,
};
use crate::status::{EntityStatus, StatusLevel, SubsystemStatus};

/// The probes, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeKind {
    MasterNodes,
    Etcd,
    ApiServer,
    Operators,
    ControlPlanePods,
    Certificates,
}

impl ProbeKind {
    pub const ALL: [Self; 6] = [
        Self::MasterNodes,
        Self::Etcd,
        Self::ApiServer,
        Self::Operators,
        Self::ControlPlanePods,
        Self::Certificates,
    ];

    /// Section title used by renderers.
    pub fn title(self) -> &'static str {
        match self {
            Self::MasterNodes => "Master Nodes Status",
            Self::Etcd => "etcd Cluster Status",
            Self::ApiServer => "API Server Status",
            Self::Operators => "Critical Operators Status",
            Self::ControlPlanePods => "Control Plane Components Status",
            Self::Certificates => "Certificate Status",
        }
    }

    /// Whether this probe reports one status per entity.
    pub fn reports_entities(self) -> bool {
        matches!(
            self,
            Self::MasterNodes | Self::Operators | Self::ControlPlanePods
        )
    }

    /// Run this probe.
    pub async fn run(self, ctx: &ProbeContext<'_>) -> ProbeOutcome {
        match self {
            Self::MasterNodes => master_nodes::check(ctx).await,
            Self::Etcd => etcd::check(ctx).await,
            Self::ApiServer => api_server::check(ctx).await,
            Self::Operators => operators::check(ctx).await,
            Self::ControlPlanePods => control_plane::check(ctx).await,
            Self::Certificates => certificates::check(ctx).await,
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MasterNodes => write!(f, "master-nodes"),
            Self::Etcd => write!(f, "etcd"),
            Self::ApiServer => write!(f, "api-server"),
            Self::Operators => write!(f, "operators"),
            Self::ControlPlanePods => write!(f, "control-plane-pods"),
            Self::Certificates => write!(f, "certificates"),
        }
    }
}

/// What one probe found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result", rename_all = "kebab-case")]
pub enum ProbeOutcome {
    /// One status per node, pod or operator.
    Entities(Vec<EntityStatus>),
    /// One status for the whole subsystem.
    Subsystem(SubsystemStatus),
    ApiServer(ApiServerHealth),
}

impl ProbeOutcome {
    /// Error-level outcome shaped the way `kind` normally reports.
    pub fn failed(kind: ProbeKind, failure: &ProbeFailure) -> Self {
        let message = failure.to_string();
        if kind.reports_entities() {
            Self::Entities(vec![EntityStatus::error("unknown", message)])
        } else {
            Self::Subsystem(SubsystemStatus::error(message))
        }
    }

    /// Most severe level in the outcome.
    pub fn level(&self) -> StatusLevel {
        match self {
            Self::Entities(entities) => entities
                .iter()
                .fold(StatusLevel::Healthy, |level, entity| level.escalate(entity.level)),
            Self::Subsystem(status) => status.level,
            Self::ApiServer(health) => health.level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub kind: ProbeKind,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn level(&self) -> StatusLevel {
        self.outcome.level()
    }
}

/// All probe results for one run. Built once, then handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub probes: Vec<ProbeResult>,
}

impl HealthReport {
    pub fn probe(&self, kind: ProbeKind) -> Option<&ProbeResult> {
        self.probes.iter().find(|result| result.kind == kind)
    }

    /// Most severe level across all probes.
    pub fn overall_level(&self) -> StatusLevel {
        self.probes
            .iter()
            .fold(StatusLevel::Healthy, |level, result| level.escalate(result.level()))
    }

    /// Whether any probe is Unhealthy or Error.
    pub fn has_failures(&self) -> bool {
        self.probes.iter().any(|result| result.level().is_failure())
    }
}

/// Tuning for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    pub retry: RetryPolicy,
    pub page_size: u32,
    /// Overall time budget for the run, shared by every probe.
    pub deadline: Duration,
    /// Probes allowed to run at once; 1 runs them one after another.
    pub concurrency: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            page_size: MAX_PAGE_SIZE,
            deadline: Duration::from_secs(120),
            concurrency: 1,
        }
    }
}

/// Runs the probes and builds the report.
pub struct HealthChecker {
    cluster: Arc<dyn ClusterQuery>,
    endpoint: Arc<dyn EndpointCheck>,
    options: CheckOptions,
}

impl HealthChecker {
    pub fn new(
        cluster: Arc<dyn ClusterQuery>,
        endpoint: Arc<dyn EndpointCheck>,
        options: CheckOptions,
    ) -> Self {
        Self {
            cluster,
            endpoint,
            options,
        }
    }

    /// Run every probe and return the report stamped with `generated_at`.
    pub async fn run(&self, generated_at: DateTime<Utc>) -> HealthReport {
        self.run_probes(&ProbeKind::ALL, generated_at).await
    }

    /// Run a subset of probes. Results keep display order whatever order
    /// `kinds` is given in, and duplicates run once.
    pub async fn run_probes(&self, kinds: &[ProbeKind], generated_at: DateTime<Utc>) -> HealthReport {
        let mut kinds = kinds.to_vec();
        kinds.sort_unstable();
        kinds.dedup();

        let deadline = Instant::now() + self.options.deadline;
        info!(
            probes = kinds.len(),
            concurrency = self.options.concurrency,
            deadline_secs = self.options.deadline.as_secs(),
            "Running health probes"
        );

        // `buffered` yields in input order, so display order is fixed
        // regardless of which probe finishes first.
        let probes = stream::iter(kinds)
            .map(|kind| self.run_probe(kind, deadline))
            .buffered(self.options.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        HealthReport {
            generated_at,
            probes,
        }
    }

    async fn run_probe(&self, kind: ProbeKind, deadline: Instant) -> ProbeResult {
        let fetcher = Fetcher::new(
            self.cluster.as_ref(),
            self.options.retry,
            self.options.page_size,
        );
        let ctx = ProbeContext::new(fetcher, self.endpoint.as_ref());
        let started = Instant::now();

        let probe = AssertUnwindSafe(kind.run(&ctx)).catch_unwind();
        let outcome = match tokio::time::timeout_at(deadline, probe).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => {
                let failure = ProbeFailure::Panicked(panic_message(panic.as_ref()));
                error!(probe = %kind, error = %failure, "Probe aborted");
                ProbeOutcome::failed(kind, &failure)
            }
            Err(_) => {
                let failure = ProbeFailure::TimedOut(self.options.deadline);
                warn!(probe = %kind, error = %failure, "Probe abandoned at deadline");
                ProbeOutcome::failed(kind, &failure)
            }
        };

        debug!(
            probe = %kind,
            level = %outcome.level(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Probe finished"
        );

        ProbeResult { kind, outcome }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
