//! Run configuration.
//!
//! Values come from built-in defaults, then an optional YAML file, then
//! command line flags. Durations are whole seconds (milliseconds for the
//! retry delay) so the file stays readable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::MAX_PAGE_SIZE;
use crate::error::HealthError;
use crate::fetch::RetryPolicy;
use crate::report::CheckOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HealthConfig {
    /// Kubeconfig file; the environment is used when unset.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context; the current context when unset.
    pub context: Option<String>,
    /// Health endpoint; `<cluster url>/healthz` when unset.
    pub api_health_url: Option<String>,
    /// Accept self-signed API server certificates.
    pub insecure_skip_tls_verify: bool,

    /// Items requested per list call, clamped to 1..=100.
    pub page_size: u32,
    /// Attempts per page or object before giving up.
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub endpoint_timeout_secs: u64,
    /// Time budget for the whole run.
    pub deadline_secs: u64,
    /// Probes allowed to run at once.
    pub concurrency: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            api_health_url: None,
            insecure_skip_tls_verify: false,
            page_size: MAX_PAGE_SIZE,
            retry_attempts: RetryPolicy::DEFAULT_ATTEMPTS,
            retry_delay_ms: 1000,
            request_timeout_secs: 30,
            endpoint_timeout_secs: 5,
            deadline_secs: 120,
            concurrency: 1,
        }
    }
}

impl HealthConfig {
    /// Load configuration from a YAML file. Keys left out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, HealthError> {
        let contents = std::fs::read_to_string(path).map_err(|e| HealthError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_yaml::from_str(&contents).map_err(|e| HealthError::ConfigFile {
            path: path.to_path_buf(),
            message: format!("invalid YAML: {e}"),
        })
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), HealthError> {
        if self.retry_attempts == 0 {
            return Err(HealthError::InvalidConfig(
                "retry-attempts must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(HealthError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.deadline_secs == 0 {
            return Err(HealthError::InvalidConfig(
                "deadline-secs must be greater than 0".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            tracing::warn!(
                page_size = self.page_size,
                max = MAX_PAGE_SIZE,
                "Page size out of range, clamping"
            );
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn endpoint_timeout(&self) -> Duration {
        Duration::from_secs(self.endpoint_timeout_secs)
    }

    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            retry: self.retry_policy(),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
            deadline: Duration::from_secs(self.deadline_secs),
            concurrency: self.concurrency,
        }
    }
}
