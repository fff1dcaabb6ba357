//! API server health endpoint check.
//!
//! A single bounded GET against the health path. Transport failures and
//! non-200 answers both count as "endpoint unhealthy"; neither is an error
//! for the probe that asks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Default time allowed for the health endpoint to answer.
pub const DEFAULT_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Issues one request to the health path and reports the status code.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EndpointCheck: Send + Sync {
    async fn status(&self) -> Result<u16, EndpointError>;
}

/// reqwest-backed endpoint check.
pub struct HttpEndpointCheck {
    http_client: HttpClient,
    url: String,
}

impl HttpEndpointCheck {
    /// Create a check for `url` bounded by `timeout`.
    ///
    /// `accept_invalid_certs` allows self-signed API certificates.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self, EndpointError> {
        let http_client = HttpClient::builder()
            .user_agent(concat!("master-health/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EndpointCheck for HttpEndpointCheck {
    async fn status(&self) -> Result<u16, EndpointError> {
        let response = self.http_client.get(&self.url).send().await?;
        Ok(response.status().as_u16())
    }
}

/// `true` only for a 200 answer.
pub async fn is_healthy(check: &dyn EndpointCheck) -> bool {
    match check.status().await {
        Ok(200) => true,
        Ok(status) => {
            debug!(status, "API health endpoint returned non-200");
            false
        }
        Err(e) => {
            debug!(error = %e, "API health endpoint unreachable");
            false
        }
    }
}
