//! Shared configuration values and the service that stores them.
//!
//! # Data Flow
//! ```text
//! blacklister engine
//!     → client.rs (typed ConfigClient: forbidden list, threshold, set)
//!     → HTTP: GET|PUT /config/{key}          (HttpConfigClient)
//!       or in-process                         (StoreConfigClient)
//!     → server.rs (axum router)
//!     → store.rs (raw bytes per key, stored verbatim)
//! ```
//!
//! # Design Decisions
//! - The store never interprets values; serialization belongs to the client
//! - Values travel as JSON

pub mod client;
pub mod server;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{ConfigClient, HttpConfigClient, StoreConfigClient};
pub use server::ConfigServer;
pub use store::{ConfigStore, MemoryConfigStore};

/// Key holding the forbidden hostname list.
pub const FORBIDDEN_HOSTNAMES_KEY: &str = "forbidden-hostnames";

/// Key holding the blacklist threshold.
pub const BLACKLIST_THRESHOLD_KEY: &str = "blacklist-threshold";

/// One entry of the forbidden hostname list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenHostname {
    pub hostname: String,
}

impl ForbiddenHostname {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }
}

/// Number of confirmed timeouts after which a hostname is blacklisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistThreshold {
    pub threshold: i64,
}

/// Returns true if `hostname` is present in `list`, ignoring ASCII case.
pub fn contains_hostname(list: &[ForbiddenHostname], hostname: &str) -> bool {
    list.iter()
        .any(|entry| entry.hostname.eq_ignore_ascii_case(hostname))
}

/// Errors that can occur while reading or writing configuration values.
#[derive(Debug, Error)]
pub enum ConfigApiError {
    /// The key has never been written.
    #[error("config key '{0}' not found")]
    NotFound(String),

    /// The config service answered with an unexpected status.
    #[error("config service returned {status} for key '{key}'")]
    Status { key: String, status: u16 },

    /// The request to the config service failed.
    #[error("config service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A stored value could not be (de)serialized.
    #[error("invalid config value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The config service base URL cannot address keys.
    #[error("invalid config service URL: {0}")]
    InvalidUrl(String),

    /// Persisting the store to disk failed.
    #[error("config store persistence failed: {0}")]
    Persistence(#[from] std::io::Error),
}

/// Result type for config operations.
pub type ConfigApiResult<T> = Result<T, ConfigApiError>;
