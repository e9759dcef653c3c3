//! Key/value storage behind the config service.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::configapi::{ConfigApiError, ConfigApiResult};
use crate::persistence;

/// Raw configuration storage. Values are stored and returned verbatim.
pub trait ConfigStore: Send + Sync {
    /// Return the last value written for `key`.
    fn get(&self, key: &str) -> ConfigApiResult<Vec<u8>>;

    /// Store `value` for `key`, replacing any prior value.
    fn set(&self, key: &str, value: Vec<u8>) -> ConfigApiResult<()>;
}

/// A thread-safe in-memory store, optionally mirrored to a JSON file.
///
/// With a mirror, a write becomes visible only once the file holding it has
/// been replaced; a failed save leaves both memory and disk unchanged.
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<DashMap<String, Vec<u8>>>,
    persistence_path: Option<PathBuf>,
    save_lock: Arc<Mutex<()>>,
}

impl MemoryConfigStore {
    /// Create an empty, non-persistent store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists; every later `set` rewrites the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigApiResult<Self> {
        let path = path.as_ref();
        let store = Self {
            persistence_path: Some(path.to_path_buf()),
            ..Self::default()
        };

        if let Some(map) = persistence::read_json::<HashMap<String, Vec<u8>>>(path)? {
            for (k, v) in map {
                store.inner.insert(k, v);
            }
            tracing::info!(path = %path.display(), keys = store.inner.len(), "Loaded config store");
        }

        Ok(store)
    }

    fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> ConfigApiResult<Vec<u8>> {
        self.inner
            .get(key)
            .map(|r| r.value().clone())
            .ok_or_else(|| ConfigApiError::NotFound(key.to_string()))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> ConfigApiResult<()> {
        let Some(path) = &self.persistence_path else {
            self.inner.insert(key.to_string(), value);
            return Ok(());
        };

        // Saves are serialized so the file never lags behind memory
        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = self.snapshot();
        snapshot.insert(key.to_string(), value.clone());
        if let Err(e) = persistence::write_json(path, &snapshot) {
            tracing::error!(path = %path.display(), key = %key, error = %e, "Failed to persist config store");
            return Err(e.into());
        }

        self.inner.insert(key.to_string(), value);
        Ok(())
    }
}
