//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs parse
//! - Validate value ranges (timeouts > 0, threshold >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BlacklisterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::BlacklisterConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `events.concurrency`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &BlacklisterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.config_api.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "config_api.bind_address",
            format!("'{}' is not a socket address", config.config_api.bind_address),
        ));
    }
    if url::Url::parse(&config.config_api.url).is_err() {
        errors.push(ValidationError::new(
            "config_api.url",
            format!("'{}' is not a valid URL", config.config_api.url),
        ));
    }
    if config.config_api.request_timeout_secs == 0 {
        errors.push(ValidationError::new("config_api.request_timeout_secs", "must be > 0"));
    }

    if config.cache.name.trim().is_empty() {
        errors.push(ValidationError::new("cache.name", "must not be empty"));
    }

    if config.prober.timeout_secs == 0 {
        errors.push(ValidationError::new("prober.timeout_secs", "must be > 0"));
    }
    if let Some(proxy) = &config.prober.proxy_url {
        if url::Url::parse(proxy).is_err() {
            errors.push(ValidationError::new(
                "prober.proxy_url",
                format!("'{}' is not a valid URL", proxy),
            ));
        }
    }

    if config.events.topic.trim().is_empty() {
        errors.push(ValidationError::new("events.topic", "must not be empty"));
    }
    if config.events.queue.trim().is_empty() {
        errors.push(ValidationError::new("events.queue", "must not be empty"));
    }
    if config.events.concurrency == 0 {
        errors.push(ValidationError::new("events.concurrency", "must be > 0"));
    }
    if config.events.base_delay_ms > config.events.max_delay_ms {
        errors.push(ValidationError::new(
            "events.base_delay_ms",
            "must not exceed events.max_delay_ms",
        ));
    }

    if config.defaults.blacklist_threshold < 1 {
        errors.push(ValidationError::new("defaults.blacklist_threshold", "must be >= 1"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
