//! Typed access to the shared configuration values.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use url::Url;

use crate::configapi::{
    BlacklistThreshold, ConfigApiError, ConfigApiResult, ConfigStore, ForbiddenHostname,
    BLACKLIST_THRESHOLD_KEY, FORBIDDEN_HOSTNAMES_KEY,
};

/// Read/write access to the forbidden hostname list and the blacklist threshold.
///
/// Writes replace the whole value. There is no conditional write, so a
/// read-modify-write by two callers can race.
#[async_trait]
pub trait ConfigClient: Send + Sync {
    /// Current forbidden hostname list. An unset list is empty.
    async fn get_forbidden_hostnames(&self) -> ConfigApiResult<Vec<ForbiddenHostname>>;

    /// Current blacklist threshold.
    async fn get_blacklist_threshold(&self) -> ConfigApiResult<BlacklistThreshold>;

    /// Store an already-serialized value under `key`.
    async fn set_value(&self, key: &str, value: serde_json::Value) -> ConfigApiResult<()>;
}

impl dyn ConfigClient + '_ {
    /// Serialize `value` as JSON and store it under `key`.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> ConfigApiResult<()> {
        let value = serde_json::to_value(value)?;
        self.set_value(key, value).await
    }
}

fn decode_forbidden(raw: ConfigApiResult<Vec<u8>>) -> ConfigApiResult<Vec<ForbiddenHostname>> {
    match raw {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(ConfigApiError::NotFound(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Config client talking to the config service over HTTP.
#[derive(Clone)]
pub struct HttpConfigClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpConfigClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> ConfigApiResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigApiError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    fn key_url(&self, key: &str) -> ConfigApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["config", key]);
        Ok(url)
    }

    /// Fetch the raw bytes stored under `key`.
    pub async fn get_raw(&self, key: &str) -> ConfigApiResult<Vec<u8>> {
        let response = self.http.get(self.key_url(key)?).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ConfigApiError::NotFound(key.to_string())),
            status if !status.is_success() => Err(ConfigApiError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            }),
            _ => Ok(response.bytes().await?.to_vec()),
        }
    }

    /// Store raw bytes under `key`.
    pub async fn set_raw(&self, key: &str, value: Vec<u8>) -> ConfigApiResult<()> {
        let response = self
            .http
            .put(self.key_url(key)?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(value)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigApiError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigClient for HttpConfigClient {
    async fn get_forbidden_hostnames(&self) -> ConfigApiResult<Vec<ForbiddenHostname>> {
        decode_forbidden(self.get_raw(FORBIDDEN_HOSTNAMES_KEY).await)
    }

    async fn get_blacklist_threshold(&self) -> ConfigApiResult<BlacklistThreshold> {
        let bytes = self.get_raw(BLACKLIST_THRESHOLD_KEY).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn set_value(&self, key: &str, value: serde_json::Value) -> ConfigApiResult<()> {
        self.set_raw(key, serde_json::to_vec(&value)?).await
    }
}

/// Config client reading and writing a store in the same process.
#[derive(Clone)]
pub struct StoreConfigClient {
    store: Arc<dyn ConfigStore>,
}

impl StoreConfigClient {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ConfigClient for StoreConfigClient {
    async fn get_forbidden_hostnames(&self) -> ConfigApiResult<Vec<ForbiddenHostname>> {
        decode_forbidden(self.store.get(FORBIDDEN_HOSTNAMES_KEY))
    }

    async fn get_blacklist_threshold(&self) -> ConfigApiResult<BlacklistThreshold> {
        let bytes = self.store.get(BLACKLIST_THRESHOLD_KEY)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn set_value(&self, key: &str, value: serde_json::Value) -> ConfigApiResult<()> {
        self.store.set(key, serde_json::to_vec(&value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configapi::MemoryConfigStore;

    #[tokio::test]
    async fn test_store_client_typed_values() {
        let store = MemoryConfigStore::new();
        let client: Arc<dyn ConfigClient> = Arc::new(StoreConfigClient::new(Arc::new(store.clone())));

        assert!(client.get_forbidden_hostnames().await.unwrap().is_empty());
        assert!(matches!(
            client.get_blacklist_threshold().await,
            Err(ConfigApiError::NotFound(_))
        ));

        client
            .set(BLACKLIST_THRESHOLD_KEY, &BlacklistThreshold { threshold: 3 })
            .await
            .unwrap();
        client
            .set(FORBIDDEN_HOSTNAMES_KEY, &vec![ForbiddenHostname::new("a.onion")])
            .await
            .unwrap();

        assert_eq!(client.get_blacklist_threshold().await.unwrap().threshold, 3);
        assert_eq!(
            client.get_forbidden_hostnames().await.unwrap(),
            vec![ForbiddenHostname::new("a.onion")]
        );
        assert_eq!(
            store.get(FORBIDDEN_HOSTNAMES_KEY).unwrap(),
            br#"[{"hostname":"a.onion"}]"#.to_vec()
        );
    }

    #[tokio::test]
    async fn test_corrupt_value_is_an_error() {
        let store = MemoryConfigStore::new();
        store.set(FORBIDDEN_HOSTNAMES_KEY, b"not json".to_vec()).unwrap();
        let client = StoreConfigClient::new(Arc::new(store));

        assert!(matches!(
            client.get_forbidden_hostnames().await,
            Err(ConfigApiError::Serialization(_))
        ));
    }

    #[test]
    fn test_key_url() {
        let client = HttpConfigClient::new("http://127.0.0.1:8085", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.key_url("forbidden-hostnames").unwrap().as_str(),
            "http://127.0.0.1:8085/config/forbidden-hostnames"
        );

        let nested = HttpConfigClient::new("http://config.local/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            nested.key_url("a b").unwrap().as_str(),
            "http://config.local/api/config/a%20b"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            HttpConfigClient::new("mailto:ops@example.com", Duration::from_secs(1)),
            Err(ConfigApiError::InvalidUrl(_))
        ));
        assert!(HttpConfigClient::new("not a url", Duration::from_secs(1)).is_err());
    }
}
