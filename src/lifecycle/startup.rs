//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the config store and start its HTTP service
//! - Seed default config values that are missing
//! - Build the engine's capabilities from configuration
//! - Subscribe the engine and start report ingestion
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The config service listener is bound before anything talks to it

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::net::TcpListener;

use crate::blacklister::{Blacklister, Capabilities};
use crate::cache::{CacheError, MemoryCache};
use crate::config::{BlacklisterConfig, DefaultsConfig};
use crate::configapi::{
    BlacklistThreshold, ConfigApiError, ConfigApiResult, ConfigClient, ConfigServer,
    HttpConfigClient, MemoryConfigStore, BLACKLIST_THRESHOLD_KEY,
};
use crate::event::ingest::ingest_lines;
use crate::event::{EventBus, EventError, EventSource, RedeliveryPolicy};
use crate::lifecycle::Shutdown;
use crate::prober::HttpProber;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("config store: {0}")]
    Config(#[from] ConfigApiError),

    #[error("counter cache: {0}")]
    Cache(#[from] CacheError),

    #[error("prober: {0}")]
    Prober(#[from] reqwest::Error),

    #[error("event bus: {0}")]
    Event(#[from] EventError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the config store, loading its persisted state when configured.
pub fn open_store(config: &BlacklisterConfig) -> ConfigApiResult<MemoryConfigStore> {
    match &config.config_api.persistence_path {
        Some(path) => MemoryConfigStore::load_from_file(path),
        None => Ok(MemoryConfigStore::new()),
    }
}

/// Build the engine's collaborators from configuration.
pub fn build_capabilities(config: &BlacklisterConfig) -> Result<Capabilities, StartupError> {
    let config_client = HttpConfigClient::new(
        &config.config_api.url,
        Duration::from_secs(config.config_api.request_timeout_secs),
    )?;
    let prober = HttpProber::new(&config.prober)?;
    let counters = match &config.cache.persistence_path {
        Some(path) => MemoryCache::load_from_file(config.cache.name.clone(), path)?,
        None => MemoryCache::new(config.cache.name.clone()),
    };

    Ok(Capabilities {
        config_client: Arc::new(config_client),
        counters: Arc::new(counters),
        prober: Arc::new(prober),
    })
}

/// Write default values for keys that were never set.
///
/// Returns true if the threshold was seeded.
pub async fn seed_defaults(
    client: &dyn ConfigClient,
    defaults: &DefaultsConfig,
) -> ConfigApiResult<bool> {
    match client.get_blacklist_threshold().await {
        Ok(current) => {
            tracing::info!(threshold = current.threshold, "Using stored blacklist threshold");
            Ok(false)
        }
        Err(ConfigApiError::NotFound(_)) => {
            let threshold = BlacklistThreshold {
                threshold: defaults.blacklist_threshold,
            };
            client.set(BLACKLIST_THRESHOLD_KEY, &threshold).await?;
            tracing::info!(threshold = threshold.threshold, "Seeded default blacklist threshold");
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Run the whole process until `shutdown` fires.
///
/// `input` is the stream timeout reports are read from, one per line.
pub async fn run<R>(
    config: BlacklisterConfig,
    input: R,
    shutdown: Shutdown,
) -> Result<(), StartupError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let mut done = shutdown.subscribe();
    let store = open_store(&config)?;
    let listener = TcpListener::bind(&config.config_api.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        persistent = config.config_api.persistence_path.is_some(),
        "Config store ready"
    );

    let server = ConfigServer::new(Arc::new(store));
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run(listener, server_shutdown).await {
            tracing::error!(error = %e, "Config service failed");
        }
    });

    let capabilities = build_capabilities(&config)?;
    seed_defaults(capabilities.config_client.as_ref(), &config.defaults).await?;

    let engine = Arc::new(Blacklister::new(
        capabilities,
        config.engine.promotion_guard,
    ));
    tracing::info!(guard = ?config.engine.promotion_guard, "Blacklister initialized");

    let bus = EventBus::new(
        RedeliveryPolicy::from_config(&config.events),
        config.events.concurrency,
        shutdown.sender(),
    );
    bus.subscribe(&config.events.topic, &config.events.queue, engine)?;

    let topic = config.events.topic.clone();
    let ingest_shutdown = shutdown.subscribe();
    let ingest_bus = bus.clone();
    tokio::spawn(async move {
        if let Err(e) = ingest_lines(input, &ingest_bus, &topic, ingest_shutdown).await {
            tracing::error!(error = %e, "Report ingestion failed");
        }
    });

    let _ = done.recv().await;

    let _ = server_task.await;
    tracing::info!("Blacklister stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FailureCounterStore, Ttl};
    use crate::configapi::{ConfigStore, StoreConfigClient};

    #[tokio::test]
    async fn test_seed_defaults_only_when_missing() {
        let store = MemoryConfigStore::new();
        let client = StoreConfigClient::new(Arc::new(store.clone()));
        let defaults = DefaultsConfig {
            blacklist_threshold: 4,
        };

        assert!(seed_defaults(&client, &defaults).await.unwrap());
        assert_eq!(
            store.get(BLACKLIST_THRESHOLD_KEY).unwrap(),
            br#"{"threshold":4}"#.to_vec()
        );

        store
            .set(BLACKLIST_THRESHOLD_KEY, br#"{"threshold":9}"#.to_vec())
            .unwrap();
        assert!(!seed_defaults(&client, &defaults).await.unwrap());
        assert_eq!(client.get_blacklist_threshold().await.unwrap().threshold, 9);
    }

    #[test]
    fn test_build_capabilities_from_defaults() {
        assert!(build_capabilities(&BlacklisterConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_counters_reload_from_persistence_path() {
        let path = std::env::temp_dir().join(format!("counters-{}.json", uuid::Uuid::new_v4()));
        let mut config = BlacklisterConfig::default();
        config.cache.persistence_path = Some(path.display().to_string());

        let first = build_capabilities(&config).unwrap();
        first
            .counters
            .set_i64("example.onion", 2, Ttl::NoExpiry)
            .await
            .unwrap();

        let restarted = build_capabilities(&config).unwrap();
        assert_eq!(restarted.counters.get_i64("example.onion").await.unwrap(), 2);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_corrupt_counter_file_aborts_startup() {
        let path = std::env::temp_dir().join(format!("counters-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"not json").unwrap();
        let mut config = BlacklisterConfig::default();
        config.cache.persistence_path = Some(path.display().to_string());

        assert!(matches!(
            build_capabilities(&config),
            Err(StartupError::Cache(CacheError::Persistence(_)))
        ));

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
