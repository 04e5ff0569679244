use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use stocksync_feed::{FeedCache, FeedError, FeedSource};
use stocksync_updater::{EngineSettings, InMemoryCatalog, SyncEngine};

/// Feed source serving fixed bytes, or failing every fetch.
pub(crate) struct StaticSource(Option<Vec<u8>>);

impl StaticSource {
    pub(crate) fn csv(body: &str) -> Self {
        Self(Some(body.as_bytes().to_vec()))
    }

    pub(crate) fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<u8>, FeedError> {
        self.0.clone().ok_or_else(|| FeedError::UnexpectedStatus {
            status: 503,
            url: "https://supplier.test/feed.csv".to_string(),
        })
    }
}

/// Pool that never connects unless a query runs.
pub(crate) fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://stocksync@127.0.0.1:1/unused")
        .expect("lazy pool")
}

pub(crate) fn engine_with(
    catalog: Arc<InMemoryCatalog>,
    source: StaticSource,
) -> Arc<SyncEngine> {
    let feed = Arc::new(FeedCache::new(Arc::new(source), Duration::from_secs(600)));
    Arc::new(SyncEngine::new(
        catalog,
        feed,
        EngineSettings::default(),
    ))
}
