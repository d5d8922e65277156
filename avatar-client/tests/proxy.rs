//! End-to-end resolver behaviour against a mocked avatar proxy.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use avatar_cache::AvatarCache;
use avatar_client::{AvatarResolver, AvatarSource, ProxyClient, ProxyConfig, ResolverConfig};
use avatar_core::{AvatarError, PlayerId, DEFAULT_STORAGE_KEY};
use avatar_store::{FileStore, MemoryStore};

const AVATAR_PATH: &str = "/api/roblox-avatar";

fn endpoint(server: &MockServer) -> String {
    format!("{}{}", server.uri(), AVATAR_PATH)
}

fn proxy(server: &MockServer) -> Arc<ProxyClient> {
    Arc::new(ProxyClient::with_config(ProxyConfig::new(endpoint(server))).unwrap())
}

async fn requests(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

async fn mount_avatar(server: &MockServer, id: &str, url: &str) {
    Mock::given(method("GET"))
        .and(path(AVATAR_PATH))
        .and(query_param("userId", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "imageUrl": url })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_resolve_then_cache_hit() {
    let server = MockServer::start().await;
    mount_avatar(&server, "156", "https://cdn/x.png").await;

    let resolver = AvatarResolver::new(proxy(&server), Arc::new(MemoryStore::new())).await;

    assert_eq!(resolver.resolve("156").await.as_deref(), Some("https://cdn/x.png"));
    assert_eq!(resolver.resolve("156").await.as_deref(), Some("https://cdn/x.png"));
    assert_eq!(requests(&server).await, 1);
}

#[tokio::test]
async fn test_negative_id_makes_no_request() {
    let server = MockServer::start().await;
    let resolver = AvatarResolver::new(proxy(&server), Arc::new(MemoryStore::new())).await;

    assert!(resolver.resolve("-1").await.is_none());
    assert!(resolver.resolve("0").await.is_none());
    assert!(resolver.resolve("").await.is_none());
    assert_eq!(requests(&server).await, 0);
}

#[tokio::test]
async fn test_not_found_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AVATAR_PATH))
        .and(query_param("userId", "999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Avatar not found" })))
        .mount(&server)
        .await;

    let resolver = AvatarResolver::new(proxy(&server), Arc::new(MemoryStore::new())).await;

    assert!(resolver.resolve("999").await.is_none());
    assert!(resolver.resolve("999").await.is_none());
    assert_eq!(requests(&server).await, 2);
}

#[tokio::test]
async fn test_server_error_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AVATAR_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let resolver = AvatarResolver::new(proxy(&server), Arc::new(MemoryStore::new())).await;

    assert!(resolver.resolve("12").await.is_none());
    assert!(resolver.resolve("12").await.is_none());
    assert_eq!(requests(&server).await, 2);
}

#[tokio::test]
async fn test_concurrent_callers_coalesce() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(AVATAR_PATH))
        .and(query_param("userId", "77"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "imageUrl": "https://cdn/77.png" }))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&server)
        .await;

    let resolver = AvatarResolver::new(proxy(&server), Arc::new(MemoryStore::new())).await;

    let results = futures::future::join_all((0..10).map(|_| resolver.resolve("77"))).await;

    assert!(results.iter().all(|r| r.as_deref() == Some("https://cdn/77.png")));
    assert_eq!(requests(&server).await, 1);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let server = MockServer::start().await;
    mount_avatar(&server, "5", "https://cdn/5.png").await;

    let resolver = AvatarResolver::with_cache(
        AvatarCache::with_ttl(Duration::from_millis(50)),
        DEFAULT_STORAGE_KEY,
        proxy(&server),
        Arc::new(MemoryStore::new()),
    )
    .await;

    resolver.resolve("5").await;
    resolver.resolve("5").await;
    assert_eq!(requests(&server).await, 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    resolver.resolve("5").await;
    assert_eq!(requests(&server).await, 2);
}

#[tokio::test]
async fn test_invalidate_forces_request() {
    let server = MockServer::start().await;
    mount_avatar(&server, "156", "https://cdn/x.png").await;

    let resolver = AvatarResolver::new(proxy(&server), Arc::new(MemoryStore::new())).await;

    resolver.resolve("156").await;
    resolver.invalidate(Some("156")).await;
    resolver.resolve("156").await;
    assert_eq!(requests(&server).await, 2);
}

#[tokio::test]
async fn test_proxy_client_error_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("userId", "404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "User has no avatar" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("userId", "502"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("userId", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "Pending" })))
        .mount(&server)
        .await;

    let client = proxy(&server);
    let id = |n: u64| PlayerId::new(n).unwrap();

    match client.fetch_avatar_url(id(404)).await.unwrap_err() {
        AvatarError::NotFound { id, message } => {
            assert_eq!(id, "404");
            assert_eq!(message.as_deref(), Some("User has no avatar"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }

    assert!(matches!(
        client.fetch_avatar_url(id(502)).await.unwrap_err(),
        AvatarError::UnexpectedStatus { status: 502, .. }
    ));

    assert!(matches!(
        client.fetch_avatar_url(id(200)).await.unwrap_err(),
        AvatarError::MalformedResponse(_)
    ));
}

#[tokio::test]
async fn test_unreachable_proxy_degrades_to_none() {
    // Bind then drop a server so the port is closed
    let uri = {
        let server = MockServer::start().await;
        endpoint(&server)
    };
    let client = Arc::new(ProxyClient::with_config(ProxyConfig::new(uri).with_timeout(2)).unwrap());
    let resolver = AvatarResolver::new(client, Arc::new(MemoryStore::new())).await;

    assert!(resolver.resolve("1").await.is_none());
    assert_eq!(resolver.in_flight(), 0);
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let server = MockServer::start().await;
    mount_avatar(&server, "156", "https://cdn/x.png").await;
    let dir = tempdir().unwrap();

    let config = ResolverConfig::with_proxy(endpoint(&server)).with_cache_dir(dir.path());

    {
        let resolver = AvatarResolver::from_config(config.clone()).await.unwrap();
        assert_eq!(resolver.resolve("156").await.as_deref(), Some("https://cdn/x.png"));
    }

    let store = FileStore::new(dir.path()).await.unwrap();
    assert!(store.path_for(DEFAULT_STORAGE_KEY).unwrap().exists());

    let resolver = AvatarResolver::from_config(config).await.unwrap();
    assert_eq!(resolver.cached("156").as_deref(), Some("https://cdn/x.png"));
    assert_eq!(resolver.resolve("156").await.as_deref(), Some("https://cdn/x.png"));
    assert_eq!(requests(&server).await, 1);
}

#[tokio::test]
async fn test_from_config_rejects_bad_endpoint() {
    let result = AvatarResolver::from_config(ResolverConfig::with_proxy("::not a url::")).await;
    assert!(matches!(result, Err(AvatarError::Config(_))));
}
