//! Blacklisting decision engine.
//!
//! # Decision Flow
//! ```text
//! TimeoutReport{url}
//!     → parse URL → hostname + origin          (MalformedUrl)
//!     → forbidden list contains hostname?      (AlreadyBlacklisted, no probe)
//!     → probe origin; not a timeout?           (stop, nothing changes)
//!     → threshold, counter + 1
//!     → count < threshold: store count
//!     → count >= threshold: re-read list, append if absent, store count
//! ```
//!
//! # Concurrency
//! Counter and list updates are read-modify-write without a conditional
//! write. With `PromotionGuard::BestEffort` two reports for one hostname can
//! both read the same count (an increment is lost) and can both pass the
//! second list check. `PromotionGuard::PerHostname` serializes everything
//! after the probe per hostname, inside this process only.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use url::{Host, Url};

use crate::blacklister::error::{BlacklistError, BlacklistResult};
use crate::blacklister::Capabilities;
use crate::cache::{CacheError, FailureCounterStore, Ttl};
use crate::config::PromotionGuard;
use crate::configapi::{contains_hostname, ConfigClient, ForbiddenHostname, FORBIDDEN_HOSTNAMES_KEY};
use crate::event::TimeoutReport;
use crate::observability::metrics;
use crate::prober::{LivenessProber, ProbeOutcome};

/// Host a report is about.
///
/// Domains come out lowercased and IDNA-encoded. Forbidden list entries are
/// matched ignoring ASCII case, so entries written by hand in mixed case
/// still count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host without port or IPv6 brackets.
    pub hostname: String,
    /// `scheme://host[:port]`, what the probe is sent to.
    pub origin: String,
}

impl Target {
    pub fn parse(raw: &str) -> BlacklistResult<Self> {
        let url = Url::parse(raw).map_err(|e| BlacklistError::malformed(raw, e))?;

        let hostname = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            _ => return Err(BlacklistError::malformed(raw, "URL has no host")),
        };

        let host = url.host_str().unwrap_or(&hostname);
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        Ok(Self { hostname, origin })
    }
}

/// What a handled report led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The probe did not confirm the timeout; nothing changed.
    NotConfirmed(ProbeOutcome),
    /// Counter stored below the threshold.
    Watched { count: i64, threshold: i64 },
    /// Hostname appended to the forbidden list.
    Blacklisted { count: i64 },
    /// Threshold reached but another report already listed the hostname.
    AlreadyListed { count: i64 },
}

impl Decision {
    fn label(&self) -> &'static str {
        match self {
            Decision::NotConfirmed(_) => "not_confirmed",
            Decision::Watched { .. } => "watched",
            Decision::Blacklisted { .. } => "blacklisted",
            Decision::AlreadyListed { .. } => "already_listed",
        }
    }
}

/// Decides, report by report, whether a hostname gets blacklisted.
pub struct Blacklister {
    config_client: Arc<dyn ConfigClient>,
    counters: Arc<dyn FailureCounterStore>,
    prober: Arc<dyn LivenessProber>,
    guard: PromotionGuard,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Blacklister {
    pub fn new(capabilities: Capabilities, guard: PromotionGuard) -> Self {
        Self {
            config_client: capabilities.config_client,
            counters: capabilities.counters,
            prober: capabilities.prober,
            guard,
            locks: DashMap::new(),
        }
    }

    /// Handle one timeout report.
    pub async fn on_timeout_report(&self, report: &TimeoutReport) -> BlacklistResult<Decision> {
        let result = self.decide(report).await;
        match &result {
            Ok(decision) => metrics::record_report(decision.label()),
            Err(e) => metrics::record_report(e.label()),
        }
        result
    }

    async fn decide(&self, report: &TimeoutReport) -> BlacklistResult<Decision> {
        let target = Target::parse(&report.url)?;
        let hostname = target.hostname.as_str();

        // Skip probing hosts that are already banned
        let forbidden = self.config_client.get_forbidden_hostnames().await?;
        if contains_hostname(&forbidden, hostname) {
            return Err(BlacklistError::AlreadyBlacklisted(target.hostname));
        }

        let outcome = ProbeOutcome::from_result(&self.prober.get(&target.origin).await);
        metrics::record_probe(outcome.as_str());
        if outcome != ProbeOutcome::TimedOut {
            tracing::trace!(hostname = %hostname, outcome = outcome.as_str(), "Timeout not confirmed");
            return Ok(Decision::NotConfirmed(outcome));
        }

        tracing::debug!(hostname = %hostname, "Timeout confirmed");

        match self.guard {
            PromotionGuard::BestEffort => self.record_failure(hostname).await,
            PromotionGuard::PerHostname => {
                let lock = self.locks.entry(hostname.to_string()).or_default().clone();
                let result = {
                    let _held = lock.lock().await;
                    self.record_failure(hostname).await
                };
                drop(lock);
                self.locks
                    .remove_if(hostname, |_, lock| Arc::strong_count(lock) == 1);
                result
            }
        }
    }

    async fn record_failure(&self, hostname: &str) -> BlacklistResult<Decision> {
        let threshold = self.config_client.get_blacklist_threshold().await?.threshold;
        let count = self
            .counters
            .get_i64(hostname)
            .await?
            .checked_add(1)
            .ok_or_else(|| CacheError::Overflow(hostname.to_string()))?;

        if count < threshold {
            self.counters.set_i64(hostname, count, Ttl::NoExpiry).await?;
            tracing::debug!(hostname = %hostname, count, threshold, "Hostname watched");
            return Ok(Decision::Watched { count, threshold });
        }

        // The list may have changed since the first read
        let mut forbidden = self.config_client.get_forbidden_hostnames().await?;
        let decision = if contains_hostname(&forbidden, hostname) {
            tracing::trace!(hostname = %hostname, "Skipping duplicate hostname");
            Decision::AlreadyListed { count }
        } else {
            tracing::info!(hostname = %hostname, count, "Blacklisting hostname");

            forbidden.push(ForbiddenHostname::new(hostname));
            self.config_client
                .set(FORBIDDEN_HOSTNAMES_KEY, &forbidden)
                .await?;
            metrics::record_promotion(forbidden.len());
            Decision::Blacklisted { count }
        };

        self.counters.set_i64(hostname, count, Ttl::NoExpiry).await?;
        Ok(decision)
    }
}
