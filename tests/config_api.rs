//! Config service contract over real HTTP.

use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast;

use hostname_blacklister::configapi::{
    ConfigApiError, ConfigClient, ConfigStore, ForbiddenHostname, HttpConfigClient,
    MemoryConfigStore, FORBIDDEN_HOSTNAMES_KEY,
};

mod common;

#[tokio::test]
async fn test_put_then_get_raw_value() {
    let (shutdown, _) = broadcast::channel(1);
    let url = common::start_config_service(MemoryConfigStore::new(), shutdown.subscribe()).await;
    let http = reqwest::Client::new();

    let res = http
        .put(format!("{}/config/hello", url))
        .body(r#"{"ttl": "10s"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), r#"{"ttl": "10s"}"#);

    let res = http.get(format!("{}/config/hello", url)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), r#"{"ttl": "10s"}"#);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_missing_key_is_not_found() {
    let (shutdown, _) = broadcast::channel(1);
    let url = common::start_config_service(MemoryConfigStore::new(), shutdown.subscribe()).await;
    let client = HttpConfigClient::new(&url, Duration::from_secs(2)).unwrap();

    let res = reqwest::get(format!("{}/config/nothing", url)).await.unwrap();
    assert_eq!(res.status(), 404);

    assert!(client.get_forbidden_hostnames().await.unwrap().is_empty());
    assert!(matches!(
        client.get_blacklist_threshold().await,
        Err(ConfigApiError::NotFound(_))
    ));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_client_writes_are_visible_in_store() {
    let (shutdown, _) = broadcast::channel(1);
    let store = MemoryConfigStore::new();
    let url = common::start_config_service(store.clone(), shutdown.subscribe()).await;
    let client = HttpConfigClient::new(&url, Duration::from_secs(2)).unwrap();

    client
        .set_value(
            FORBIDDEN_HOSTNAMES_KEY,
            json!([{ "hostname": "a.onion" }, { "hostname": "b.onion" }]),
        )
        .await
        .unwrap();

    assert_eq!(
        client.get_forbidden_hostnames().await.unwrap(),
        vec![ForbiddenHostname::new("a.onion"), ForbiddenHostname::new("b.onion")]
    );
    assert_eq!(
        store.get(FORBIDDEN_HOSTNAMES_KEY).unwrap(),
        br#"[{"hostname":"a.onion"},{"hostname":"b.onion"}]"#.to_vec()
    );

    let _ = shutdown.send(());
}
