//! Blacklisting decision errors.

use thiserror::Error;

use crate::cache::CacheError;
use crate::configapi::ConfigApiError;

/// Errors a blacklisting decision can end with.
#[derive(Debug, Error)]
pub enum BlacklistError {
    /// The reported URL could not be parsed or has no host.
    #[error("malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// The hostname is already in the forbidden list.
    #[error("{0} hostname is already blacklisted")]
    AlreadyBlacklisted(String),

    /// The config store could not be read or written.
    #[error("config unavailable: {0}")]
    ConfigUnavailable(#[from] ConfigApiError),

    /// The failure counter store could not be read or written.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),
}

impl BlacklistError {
    pub(crate) fn malformed(url: &str, reason: impl ToString) -> Self {
        Self::MalformedUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Expected conditions are part of normal operation, not failures.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::AlreadyBlacklisted(_))
    }

    /// Whether handling the same report again can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConfigUnavailable(_) => true,
            Self::CacheUnavailable(e) => e.is_transient(),
            Self::MalformedUrl { .. } | Self::AlreadyBlacklisted(_) => false,
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MalformedUrl { .. } => "malformed_url",
            Self::AlreadyBlacklisted(_) => "already_blacklisted",
            Self::ConfigUnavailable(_) => "config_unavailable",
            Self::CacheUnavailable(_) => "cache_unavailable",
        }
    }
}

/// Result type for blacklisting decisions.
pub type BlacklistResult<T> = Result<T, BlacklistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let listed = BlacklistError::AlreadyBlacklisted("a.onion".into());
        assert!(listed.is_expected());
        assert!(!listed.is_retryable());
        assert_eq!(listed.to_string(), "a.onion hostname is already blacklisted");

        let malformed = BlacklistError::malformed("http://%zz", "invalid domain character");
        assert!(!malformed.is_expected());
        assert!(!malformed.is_retryable());
        assert_eq!(malformed.label(), "malformed_url");

        let cache = BlacklistError::from(CacheError::Unavailable("down".into()));
        assert!(cache.is_retryable());
        assert_eq!(cache.to_string(), "cache unavailable: cache backend unavailable: down");

        let overflow = BlacklistError::from(CacheError::Overflow("a.onion".into()));
        assert!(!overflow.is_retryable());
        assert_eq!(overflow.label(), "cache_unavailable");

        let config = BlacklistError::from(ConfigApiError::NotFound("blacklist-threshold".into()));
        assert!(config.is_retryable());
        assert_eq!(config.label(), "config_unavailable");
    }
}
