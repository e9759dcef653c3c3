//! Failure counter storage.
//!
//! # Responsibilities
//! - Store one integer per hostname under a namespaced key
//! - Honour an optional expiry per entry
//! - Optionally mirror every entry to a JSON file so counters survive restarts
//!
//! # Design Decisions
//! - Counters written with `Ttl::NoExpiry` never decay
//! - Reads of a missing or expired key return 0
//! - Read and write are separate calls; there is no atomic increment
//! - Expiry deadlines are persisted as wall-clock times

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence;

/// Lifetime of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The value lives until it is overwritten.
    NoExpiry,
    /// The value is dropped after the given duration.
    After(Duration),
}

/// Errors that can occur while reading or writing the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The stored value under the key is not an integer.
    #[error("value for '{0}' is not an integer")]
    NotAnInteger(String),

    /// Incrementing the counter under the key would overflow.
    #[error("counter for '{0}' overflowed")]
    Overflow(String),

    /// The cache backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// Mirroring the cache to disk failed.
    #[error("cache persistence failed: {0}")]
    Persistence(#[from] std::io::Error),
}

impl CacheError {
    /// Whether the same operation can succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Persistence(_))
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Integer store used for per-hostname failure counters.
#[async_trait]
pub trait FailureCounterStore: Send + Sync {
    /// Current value for `key`, 0 if absent.
    async fn get_i64(&self, key: &str) -> CacheResult<i64>;

    /// Store `value` for `key` with the given lifetime.
    async fn set_i64(&self, key: &str, value: i64, ttl: Ttl) -> CacheResult<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// On-disk form of an entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at_ms: Option<u64>,
}

impl StoredEntry {
    fn from_entry(entry: &Entry, now: Instant, wall: SystemTime) -> Self {
        let expires_at_ms = entry.expires_at.map(|deadline| {
            let at = wall + deadline.saturating_duration_since(now);
            unix_millis(at)
        });
        Self {
            value: entry.value.clone(),
            expires_at_ms,
        }
    }

    /// `None` if the entry expired while on disk.
    fn into_entry(self, now: Instant, wall: SystemTime) -> Option<Entry> {
        let expires_at = match self.expires_at_ms {
            None => None,
            Some(ms) => {
                let at = UNIX_EPOCH + Duration::from_millis(ms);
                let remaining = at.duration_since(wall).ok()?;
                Some(now + remaining)
            }
        };
        Some(Entry {
            value: self.value,
            expires_at,
        })
    }
}

fn unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// A thread-safe in-memory cache with a key namespace.
#[derive(Clone)]
pub struct MemoryCache {
    name: String,
    inner: Arc<DashMap<String, Entry>>,
    persistence_path: Option<PathBuf>,
    save_lock: Arc<Mutex<()>>,
}

impl MemoryCache {
    /// Create an empty cache whose keys are prefixed with `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(DashMap::new()),
            persistence_path: None,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load from `path` if it exists; every later write rewrites the file.
    pub fn load_from_file(name: impl Into<String>, path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        let mut cache = Self::new(name);
        cache.persistence_path = Some(path.to_path_buf());

        if let Some(stored) = persistence::read_json::<HashMap<String, StoredEntry>>(path)? {
            let (now, wall) = (Instant::now(), SystemTime::now());
            for (key, entry) in stored {
                if let Some(entry) = entry.into_entry(now, wall) {
                    cache.inner.insert(key, entry);
                }
            }
            tracing::info!(path = %path.display(), entries = cache.inner.len(), "Loaded counter cache");
        }

        Ok(cache)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.name, key)
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.inner.retain(|_, entry| entry.is_live(now));
    }

    /// Number of stored entries, including not-yet-purged expired ones.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Store a raw string value.
    pub fn set_raw(&self, key: &str, value: impl Into<String>, ttl: Ttl) -> CacheResult<()> {
        let expires_at = match ttl {
            Ttl::NoExpiry => None,
            Ttl::After(duration) => Some(Instant::now() + duration),
        };
        let key = self.namespaced(key);
        let entry = Entry {
            value: value.into(),
            expires_at,
        };

        let Some(path) = &self.persistence_path else {
            self.inner.insert(key, entry);
            return Ok(());
        };

        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (now, wall) = (Instant::now(), SystemTime::now());
        let mut snapshot: HashMap<String, StoredEntry> = self
            .inner
            .iter()
            .filter(|r| r.value().is_live(now))
            .map(|r| (r.key().clone(), StoredEntry::from_entry(r.value(), now, wall)))
            .collect();
        snapshot.insert(key.clone(), StoredEntry::from_entry(&entry, now, wall));
        persistence::write_json(path, &snapshot)?;

        self.inner.insert(key, entry);
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.inner
            .get(&self.namespaced(key))
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl FailureCounterStore for MemoryCache {
    async fn get_i64(&self, key: &str) -> CacheResult<i64> {
        match self.get_raw(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| CacheError::NotAnInteger(key.to_string())),
            None => Ok(0),
        }
    }

    async fn set_i64(&self, key: &str, value: i64, ttl: Ttl) -> CacheResult<()> {
        self.set_raw(key, value.to_string(), ttl)
    }
}
