//! Recording fakes for the engine's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::cache::{CacheError, CacheResult, FailureCounterStore, MemoryCache, Ttl};
use crate::configapi::{
    BlacklistThreshold, ConfigApiError, ConfigApiResult, ConfigClient, ForbiddenHostname,
    MemoryConfigStore, StoreConfigClient,
};
use crate::prober::{LivenessProber, ProbeError, ProbeOutcome, ProbeResponse, ProbeResult};

type Hook = Box<dyn Fn() + Send + Sync>;

/// Prober that always yields the same outcome and records what it was asked.
pub struct ScriptedProber {
    outcome: ProbeOutcome,
    origins: Mutex<Vec<String>>,
    hook: Mutex<Option<Hook>>,
}

impl ScriptedProber {
    pub fn always(outcome: ProbeOutcome) -> Self {
        Self {
            outcome,
            origins: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
        }
    }

    /// Run `hook` during every probe.
    pub fn on_call(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> usize {
        self.origins.lock().unwrap().len()
    }

    pub fn origins(&self) -> Vec<String> {
        self.origins.lock().unwrap().clone()
    }
}

#[async_trait]
impl LivenessProber for ScriptedProber {
    async fn get(&self, origin: &str) -> ProbeResult<ProbeResponse> {
        self.origins.lock().unwrap().push(origin.to_string());
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook();
        }

        match self.outcome {
            ProbeOutcome::Responded => Ok(ProbeResponse { status: 200 }),
            ProbeOutcome::TimedOut => Err(ProbeError::Timeout),
            ProbeOutcome::OtherError => Err(ProbeError::Request("connection refused".into())),
        }
    }
}

/// Config client counting reads and writes on top of an in-memory store.
pub struct CountingConfigClient {
    inner: StoreConfigClient,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingConfigClient {
    pub fn over(store: MemoryConfigStore) -> Self {
        Self {
            inner: StoreConfigClient::new(Arc::new(store)),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigClient for CountingConfigClient {
    async fn get_forbidden_hostnames(&self) -> ConfigApiResult<Vec<ForbiddenHostname>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_forbidden_hostnames().await
    }

    async fn get_blacklist_threshold(&self) -> ConfigApiResult<BlacklistThreshold> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_blacklist_threshold().await
    }

    async fn set_value(&self, key: &str, value: serde_json::Value) -> ConfigApiResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_value(key, value).await
    }
}

/// Config client that reads normally but whose service rejects every write.
pub struct ReadOnlyConfigClient {
    inner: StoreConfigClient,
    attempted_writes: AtomicUsize,
}

impl ReadOnlyConfigClient {
    pub fn over(store: MemoryConfigStore) -> Self {
        Self {
            inner: StoreConfigClient::new(Arc::new(store)),
            attempted_writes: AtomicUsize::new(0),
        }
    }

    pub fn attempted_writes(&self) -> usize {
        self.attempted_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigClient for ReadOnlyConfigClient {
    async fn get_forbidden_hostnames(&self) -> ConfigApiResult<Vec<ForbiddenHostname>> {
        self.inner.get_forbidden_hostnames().await
    }

    async fn get_blacklist_threshold(&self) -> ConfigApiResult<BlacklistThreshold> {
        self.inner.get_blacklist_threshold().await
    }

    async fn set_value(&self, key: &str, _value: serde_json::Value) -> ConfigApiResult<()> {
        self.attempted_writes.fetch_add(1, Ordering::SeqCst);
        Err(ConfigApiError::Status {
            key: key.to_string(),
            status: 503,
        })
    }
}

/// Counter store recording every access and every written value.
pub struct CountingCache {
    inner: MemoryCache,
    gets: AtomicUsize,
    history: Mutex<Vec<i64>>,
}

impl CountingCache {
    pub fn new(inner: MemoryCache) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &MemoryCache {
        &self.inner
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    /// Values written, in order.
    pub fn history(&self) -> Vec<i64> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl FailureCounterStore for CountingCache {
    async fn get_i64(&self, key: &str) -> CacheResult<i64> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_i64(key).await
    }

    async fn set_i64(&self, key: &str, value: i64, ttl: Ttl) -> CacheResult<()> {
        assert_eq!(ttl, Ttl::NoExpiry, "failure counters must not expire");
        self.history.lock().unwrap().push(value);
        self.inner.set_i64(key, value, ttl).await
    }
}

/// Counter store whose backend is always down.
pub struct FailingCache;

#[async_trait]
impl FailureCounterStore for FailingCache {
    async fn get_i64(&self, _key: &str) -> CacheResult<i64> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set_i64(&self, _key: &str, _value: i64, _ttl: Ttl) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}
