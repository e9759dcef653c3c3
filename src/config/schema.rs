//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the blacklister
//! process. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the blacklister process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BlacklisterConfig {
    /// Config store HTTP service and client settings.
    pub config_api: ConfigApiConfig,

    /// Failure counter cache settings.
    pub cache: CacheConfig,

    /// Liveness probe settings.
    pub prober: ProberConfig,

    /// Event subscription settings.
    pub events: EventsConfig,

    /// Blacklisting engine settings.
    pub engine: EngineConfig,

    /// Values seeded into the config store on startup.
    pub defaults: DefaultsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Config store HTTP service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigApiConfig {
    /// Bind address of the config store service (e.g., "127.0.0.1:8085").
    pub bind_address: String,

    /// Base URL the config client talks to.
    pub url: String,

    /// Timeout for a single config API request in seconds.
    pub request_timeout_secs: u64,

    /// Optional JSON file the config store is mirrored to.
    pub persistence_path: Option<String>,
}

impl Default for ConfigApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8085".to_string(),
            url: "http://127.0.0.1:8085".to_string(),
            request_timeout_secs: 5,
            persistence_path: None,
        }
    }
}

/// Failure counter cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Namespace prefixed to every counter key.
    pub name: String,

    /// Optional JSON file the counters are mirrored to.
    pub persistence_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "down-hostname".to_string(),
            persistence_path: None,
        }
    }
}

/// Liveness prober configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProberConfig {
    /// Probe timeout in seconds. Exceeding it is a confirmed timeout.
    pub timeout_secs: u64,

    /// User-Agent header sent with probes.
    pub user_agent: String,

    /// Optional proxy all probes go through (e.g., "socks5h://127.0.0.1:9050").
    pub proxy_url: Option<String>,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "hostname-blacklister".to_string(),
            proxy_url: None,
        }
    }
}

/// Event subscription configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Topic timeout reports are published on.
    pub topic: String,

    /// Queue name of the blacklister subscription.
    pub queue: String,

    /// Maximum number of messages handled in parallel.
    pub concurrency: usize,

    /// Redeliveries attempted after a handler error before the message is dropped.
    pub max_redeliveries: u32,

    /// Base delay for redelivery backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for redelivery backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            topic: "timeout-url".to_string(),
            queue: "blacklistingQueue".to_string(),
            concurrency: 16,
            max_redeliveries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// How the engine guards the counter update and list append for one hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromotionGuard {
    /// No serialization; concurrent reports for a hostname may under-count
    /// and, rarely, both pass the second list check.
    #[default]
    BestEffort,
    /// Per-hostname mutual exclusion inside this process.
    PerHostname,
}

/// Blacklisting engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub promotion_guard: PromotionGuard,
}

/// Values seeded into the config store when absent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Confirmed timeouts required before a hostname is blacklisted.
    pub blacklist_threshold: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            blacklist_threshold: 5,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
