//! Liveness probing.
//!
//! # Responsibilities
//! - Issue one outbound request to an origin
//! - Distinguish a timeout from every other failure
//!
//! # Design Decisions
//! - Any HTTP status is a response; a 5xx still proves the host is up
//! - The deadline covers connect, proxy handshake and response headers

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time;

use crate::config::ProberConfig;

/// Errors a probe can end with.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The host did not answer before the deadline.
    #[error("probe timed out")]
    Timeout,

    /// The request failed for a reason other than the deadline.
    #[error("probe failed: {0}")]
    Request(String),
}

/// Result type for probes.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// What the probed host answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
}

/// Classified result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Responded,
    TimedOut,
    OtherError,
}

impl ProbeOutcome {
    /// Classify a raw probe result.
    pub fn from_result(result: &ProbeResult<ProbeResponse>) -> Self {
        match result {
            Ok(_) => ProbeOutcome::Responded,
            Err(ProbeError::Timeout) => ProbeOutcome::TimedOut,
            Err(ProbeError::Request(_)) => ProbeOutcome::OtherError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Responded => "responded",
            ProbeOutcome::TimedOut => "timed_out",
            ProbeOutcome::OtherError => "other_error",
        }
    }
}

/// Performs a single request against an origin.
#[async_trait]
pub trait LivenessProber: Send + Sync {
    /// Probe `origin` (`scheme://host[:port]`).
    async fn get(&self, origin: &str) -> ProbeResult<ProbeResponse>;
}

/// Prober issuing HTTP GET requests.
#[derive(Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    /// Build a prober from configuration.
    pub fn new(config: &ProberConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(0);

        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Override the probe deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl LivenessProber for HttpProber {
    async fn get(&self, origin: &str) -> ProbeResult<ProbeResponse> {
        let response_future = self.client.get(origin).send();

        match time::timeout(self.timeout, response_future).await {
            Ok(Ok(response)) => Ok(ProbeResponse {
                status: response.status().as_u16(),
            }),
            Ok(Err(e)) if e.is_timeout() => Err(ProbeError::Timeout),
            Ok(Err(e)) => Err(ProbeError::Request(e.to_string())),
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}
