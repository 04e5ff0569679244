//! `FeedClient` + `FeedCache` against a local `wiremock` server.
//!
//! No real network traffic is made. Covers the happy path, every way a
//! download can fail, and the guarantee that a failed refresh never replaces
//! a good snapshot.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stocksync_feed::{FeedCache, FeedClient, FeedError, FeedSource};

const FEED_PATH: &str = "/exports/product-export.csv";
const FEED_BODY: &str = "\u{FEFF}Handle,Variant SKU,Variant Inventory Qty\n\
shirt,SH-1,12\n\
hat,HT-2,0\n\
scarf,,4\n\
shirt-xl,sh-1,3\n";

fn feed_url(server: &MockServer) -> String {
    format!("{}{FEED_PATH}", server.uri())
}

/// 5-second timeout, no retries.
fn test_client(server: &MockServer) -> FeedClient {
    FeedClient::new(&feed_url(server), 5, "stocksync-test/0.1", 0, 0)
        .expect("failed to build test FeedClient")
}

fn test_cache(client: FeedClient) -> FeedCache {
    FeedCache::new(Arc::new(client), Duration::from_secs(900))
}

// ---------------------------------------------------------------------------
// FeedClient
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_downloads_body_and_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(header("user-agent", "stocksync-test/0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let body = test_client(&server).fetch().await.unwrap();
    assert_eq!(body, FEED_BODY.as_bytes());
}

#[tokio::test]
async fn client_reports_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = test_client(&server).fetch().await;
    assert!(
        matches!(result, Err(FeedError::UnexpectedStatus { status: 404, .. })),
        "expected UnexpectedStatus(404), got: {result:?}"
    );
}

#[tokio::test]
async fn client_rejects_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = test_client(&server).fetch().await;
    assert!(matches!(result, Err(FeedError::EmptyBody { .. })));
}

#[tokio::test]
async fn client_retries_server_error_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = FeedClient::new(&feed_url(&server), 5, "stocksync-test/0.1", 1, 0).unwrap();
    let body = client.fetch().await.unwrap();
    assert!(!body.is_empty());
}

#[tokio::test]
async fn client_does_not_retry_forbidden() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = FeedClient::new(&feed_url(&server), 5, "stocksync-test/0.1", 3, 0).unwrap();
    let result = client.fetch().await;
    assert!(matches!(
        result,
        Err(FeedError::UnexpectedStatus { status: 403, .. })
    ));
}

#[tokio::test]
async fn client_times_out_slow_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FEED_BODY)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = FeedClient::new(&feed_url(&server), 1, "stocksync-test/0.1", 0, 0).unwrap();
    let result = client.fetch().await;
    assert!(
        matches!(result, Err(FeedError::Http(_) | FeedError::Timeout { .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn retries_stay_within_the_fetch_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FEED_BODY)
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = FeedClient::new(&feed_url(&server), 1, "stocksync-test/0.1", 3, 1).unwrap();
    let started = std::time::Instant::now();
    let result = client.fetch().await;
    let elapsed = started.elapsed();

    assert!(
        matches!(result, Err(FeedError::Timeout { secs: 1, .. })),
        "got: {result:?}"
    );
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
}

#[test]
fn client_rejects_non_http_url() {
    let result = FeedClient::new("ftp://feed.example.com/export.csv", 5, "ua", 0, 0);
    assert!(matches!(result, Err(FeedError::InvalidUrl { .. })));

    let result = FeedClient::new("not a url", 5, "ua", 0, 0);
    assert!(matches!(result, Err(FeedError::InvalidUrl { .. })));
}

// ---------------------------------------------------------------------------
// FeedCache over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cache_parses_downloaded_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let cache = test_cache(test_client(&server));
    let feed = cache.get_feed(false).await;

    assert_eq!(feed.len(), 3);
    assert_eq!(feed.quantity_for("SH-1"), Some(12));
    assert_eq!(feed.quantity_for("sh-1"), Some(3));
    assert_eq!(feed.quantity_for("HT-2"), Some(0));
    assert_eq!(feed.quantity_for("ht-2"), Some(0));

    let stats = cache.get_stats().await.unwrap();
    assert_eq!(stats.total_lines, 5);
    assert_eq!(stats.skipped_no_sku, 1);
    assert_eq!(stats.valid_entries, 3);

    // Served from cache; the mock's expect(1) verifies no second request.
    cache.get_feed(false).await;
}

#[tokio::test]
async fn failed_forced_refresh_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(2)
        .mount(&server)
        .await;

    let cache = test_cache(test_client(&server));
    let first = cache.get_feed(false).await;
    let refreshed = cache.get_feed(true).await;

    assert!(Arc::ptr_eq(&first, &refreshed));
    assert_eq!(refreshed.quantity_for("SH-1"), Some(12));
    assert_eq!(cache.get_stats().await, Some(*first.stats()));
}

#[tokio::test]
async fn not_found_feed_yields_empty_snapshot_and_no_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let cache = test_cache(test_client(&server));
    let feed = cache.get_feed(false).await;

    assert!(feed.is_empty());
    assert!(cache.get_stats().await.is_none());
}
