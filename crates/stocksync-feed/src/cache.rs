//! TTL cache around the feed download and parse.
//!
//! The current snapshot lives behind an `RwLock<Option<Arc<FeedSnapshot>>>`;
//! replacing the `Arc` is the atomic swap, so readers see either the old or
//! the new snapshot and never a mix. A separate async mutex keeps at most one
//! download in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use stocksync_core::AppConfig;
use tokio::sync::{Mutex, RwLock};

use crate::client::{FeedClient, FeedSource};
use crate::error::FeedError;
use crate::parse::parse_feed;
use crate::snapshot::FeedSnapshot;
use crate::stats::ParseStats;

pub struct FeedCache {
    source: Arc<dyn FeedSource>,
    ttl: Duration,
    current: RwLock<Option<Arc<FeedSnapshot>>>,
    fetch_lock: Mutex<()>,
}

impl FeedCache {
    #[must_use]
    pub fn new(source: Arc<dyn FeedSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Cache backed by a [`FeedClient`] built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] if the feed URL or HTTP client is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self, FeedError> {
        let client = FeedClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(client),
            Duration::from_secs(config.feed_ttl_secs),
        ))
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the current feed, downloading it when forced, missing or
    /// expired.
    ///
    /// Never fails. When a download fails the previous snapshot is returned
    /// if it has not expired, otherwise an empty snapshot; the previous
    /// snapshot is never overwritten by a failure.
    pub async fn get_feed(&self, force_refresh: bool) -> Arc<FeedSnapshot> {
        if !force_refresh {
            if let Some(snapshot) = self.fresh().await {
                return snapshot;
            }
        }

        let requested_at = Instant::now();
        let _in_flight = self.fetch_lock.lock().await;

        // A download that finished while this caller waited is reused.
        if let Some(snapshot) = self.current.read().await.clone() {
            let reusable = if force_refresh {
                snapshot.built_at() >= requested_at
            } else {
                !snapshot.is_expired()
            };
            if reusable {
                return snapshot;
            }
        }

        match self.source.fetch().await {
            Ok(body) => {
                let snapshot = Arc::new(FeedSnapshot::new(parse_feed(&body), self.ttl));
                *self.current.write().await = Some(Arc::clone(&snapshot));
                tracing::info!(
                    entries = snapshot.len(),
                    valid_entries = snapshot.stats().valid_entries,
                    duplicate_skus = snapshot.stats().duplicate_skus,
                    "feed snapshot refreshed"
                );
                snapshot
            }
            Err(e) => {
                let previous = self
                    .current
                    .read()
                    .await
                    .clone()
                    .filter(|s| !s.is_expired());
                tracing::warn!(
                    error = %e,
                    serving_previous = previous.is_some(),
                    "feed download failed"
                );
                previous.unwrap_or_else(|| Arc::new(FeedSnapshot::empty()))
            }
        }
    }

    /// Stats of the last successful parse, even if that snapshot expired.
    /// `None` before the first successful download and after [`clear`](Self::clear).
    pub async fn get_stats(&self) -> Option<ParseStats> {
        self.current.read().await.as_ref().map(|s| *s.stats())
    }

    /// The cached snapshot without triggering a download.
    pub async fn snapshot(&self) -> Option<Arc<FeedSnapshot>> {
        self.current.read().await.clone()
    }

    /// Drops the cached snapshot and its stats.
    pub async fn clear(&self) {
        *self.current.write().await = None;
        tracing::info!("feed cache cleared");
    }

    async fn fresh(&self) -> Option<Arc<FeedSnapshot>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|s| !s.is_expired())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    const FEED: &str = "Variant SKU,Variant Inventory Qty\nA-1,5\nB-2,0\n";

    /// Replays queued results, then keeps failing.
    struct StubSource {
        results: std::sync::Mutex<VecDeque<Result<Vec<u8>, FeedError>>>,
        calls: AtomicU32,
        delay: Duration,
    }

    impl StubSource {
        fn new(results: Vec<Result<Vec<u8>, FeedError>>) -> Arc<Self> {
            Self::with_delay(results, Duration::ZERO)
        }

        fn with_delay(results: Vec<Result<Vec<u8>, FeedError>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                results: std::sync::Mutex::new(results.into()),
                calls: AtomicU32::new(0),
                delay,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedSource for StubSource {
        async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.results.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(server_error()))
        }
    }

    fn ok(body: &str) -> Result<Vec<u8>, FeedError> {
        Ok(body.as_bytes().to_vec())
    }

    fn server_error() -> FeedError {
        FeedError::UnexpectedStatus {
            status: 500,
            url: "https://feed.example.com/export.csv".to_owned(),
        }
    }

    fn cache(source: &Arc<StubSource>, ttl: Duration) -> FeedCache {
        FeedCache::new(Arc::clone(source) as Arc<dyn FeedSource>, ttl)
    }

    #[tokio::test]
    async fn serves_cached_snapshot_within_ttl() {
        let source = StubSource::new(vec![ok(FEED)]);
        let cache = cache(&source, Duration::from_secs(900));

        let first = cache.get_feed(false).await;
        let second = cache.get_feed(false).await;

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.quantity_for("A-1"), Some(5));
    }

    #[tokio::test]
    async fn forced_refresh_downloads_again() {
        let source = StubSource::new(vec![
            ok(FEED),
            ok("Variant SKU,Variant Inventory Qty\nA-1,9\n"),
        ]);
        let cache = cache(&source, Duration::from_secs(900));

        cache.get_feed(false).await;
        let refreshed = cache.get_feed(true).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(refreshed.quantity_for("A-1"), Some(9));
        assert_eq!(refreshed.len(), 1);
    }

    #[tokio::test]
    async fn expired_snapshot_is_downloaded_again() {
        let source = StubSource::new(vec![ok(FEED), ok(FEED)]);
        let cache = cache(&source, Duration::ZERO);

        cache.get_feed(false).await;
        cache.get_feed(false).await;

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_forced_refresh_keeps_previous_snapshot() {
        let source = StubSource::new(vec![ok(FEED), Err(server_error())]);
        let cache = cache(&source, Duration::from_secs(900));

        let first = cache.get_feed(false).await;
        let after_failure = cache.get_feed(true).await;

        assert_eq!(source.calls(), 2);
        assert!(Arc::ptr_eq(&first, &after_failure));
        assert_eq!(after_failure.quantity_for("A-1"), Some(5));
        assert_eq!(cache.get_stats().await, Some(*first.stats()));
    }

    #[tokio::test]
    async fn failure_after_expiry_returns_empty_but_keeps_stats() {
        let source = StubSource::new(vec![ok(FEED), Err(server_error())]);
        let cache = cache(&source, Duration::ZERO);

        let first = cache.get_feed(false).await;
        let after_failure = cache.get_feed(false).await;

        assert!(after_failure.is_empty());
        assert_eq!(cache.get_stats().await, Some(*first.stats()));
    }

    #[tokio::test]
    async fn first_download_failure_returns_empty_without_stats() {
        let source = StubSource::new(vec![Err(server_error())]);
        let cache = cache(&source, Duration::from_secs(900));

        let feed = cache.get_feed(false).await;

        assert!(feed.is_empty());
        assert_eq!(cache.get_stats().await, None);
        assert!(cache.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn clear_drops_snapshot_and_stats() {
        let source = StubSource::new(vec![ok(FEED), ok(FEED)]);
        let cache = cache(&source, Duration::from_secs(900));

        cache.get_feed(false).await;
        assert!(cache.get_stats().await.is_some());

        cache.clear().await;
        assert_eq!(cache.get_stats().await, None);

        cache.get_feed(false).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn header_only_feed_is_cached_as_empty_snapshot() {
        let source = StubSource::new(vec![ok("Variant SKU,Variant Inventory Qty\n")]);
        let cache = cache(&source, Duration::from_secs(900));

        let feed = cache.get_feed(false).await;

        assert!(feed.is_empty());
        assert_eq!(cache.get_stats().await.map(|s| s.total_lines), Some(1));
        cache.get_feed(false).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_download() {
        let source = StubSource::with_delay(vec![ok(FEED)], Duration::from_millis(50));
        let cache = cache(&source, Duration::from_secs(900));

        let (a, b, c) = tokio::join!(
            cache.get_feed(false),
            cache.get_feed(false),
            cache.get_feed(false)
        );

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn concurrent_forced_refreshes_share_one_download() {
        let source = StubSource::with_delay(vec![ok(FEED)], Duration::from_millis(50));
        let cache = cache(&source, Duration::from_secs(900));

        let (a, b) = tokio::join!(cache.get_feed(true), cache.get_feed(true));

        assert_eq!(source.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 2);
    }
}
