//! Bulk stock updater and the sync cycle.
//!
//! [`SyncEngine`] applies the reconciliation policy to tracked products using
//! quantities from the [`FeedCache`]. Every product is handled independently:
//! a missing product, an unknown SKU or a catalog error affects only that
//! product and is reported as an [`UpdateOutcome`], never as an error.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use stocksync_core::{
    reconcile, AppConfig, CatalogError, CatalogStore, PolicyInput, ProductId, StockStateUpdate,
    DEFAULT_THRESHOLD,
};
use stocksync_feed::{FeedCache, FeedSnapshot};
use tokio::sync::Mutex;

use crate::outcome::{SkipReason, SyncReport, UpdateOutcome, UpdateSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Threshold for products without their own override.
    pub default_threshold: i64,
    /// Product ids handled per batch in [`SyncEngine::run`].
    pub chunk_size: usize,
    /// Products reconciled concurrently within a batch.
    pub max_concurrent_updates: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            chunk_size: 100,
            max_concurrent_updates: 1,
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_threshold: config.default_threshold,
            chunk_size: config.sync_chunk_size,
            max_concurrent_updates: config.sync_max_concurrent_updates,
        }
    }
}

pub struct SyncEngine {
    catalog: Arc<dyn CatalogStore>,
    feed: Arc<FeedCache>,
    settings: EngineSettings,
    run_lock: Mutex<()>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogStore>, feed: Arc<FeedCache>, settings: EngineSettings) -> Self {
        Self {
            catalog,
            feed,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn feed(&self) -> &Arc<FeedCache> {
        &self.feed
    }

    #[must_use]
    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Reconciles one product against the cached feed.
    pub async fn update_one(&self, id: ProductId) -> UpdateOutcome {
        let snapshot = self.feed.get_feed(false).await;
        self.apply(&snapshot, id).await
    }

    /// Reconciles each product independently against one cached snapshot.
    pub async fn update_many(&self, ids: &[ProductId]) -> UpdateSummary {
        if ids.is_empty() {
            return UpdateSummary::default();
        }
        let snapshot = self.feed.get_feed(false).await;
        self.apply_all(&snapshot, ids).await
    }

    /// Runs one full sync cycle.
    ///
    /// Lists supplier-stocked products, force-refreshes the feed once, then
    /// reconciles the products in chunks against that single snapshot.
    /// Concurrent calls queue behind each other.
    pub async fn run(&self) -> SyncReport {
        let _running = self.run_lock.lock().await;
        let started_at = Utc::now();

        let ids = match self.catalog.list_tracked_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "could not list supplier-stocked products");
                return SyncReport::empty(started_at, Some(e.to_string()));
            }
        };
        if ids.is_empty() {
            tracing::info!("no supplier-stocked products, skipping sync cycle");
            return SyncReport::empty(started_at, None);
        }

        let snapshot = self.feed.get_feed(true).await;

        let mut summary = UpdateSummary::default();
        for chunk in ids.chunks(self.settings.chunk_size.max(1)) {
            summary.merge(&self.apply_all(&snapshot, chunk).await);
        }

        let report = SyncReport {
            tracked: ids.len(),
            feed_entries: snapshot.len(),
            summary,
            started_at,
            finished_at: Utc::now(),
            error: None,
        };
        tracing::info!(
            tracked = report.tracked,
            feed_entries = report.feed_entries,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            "sync cycle finished"
        );
        report
    }

    async fn apply_all(&self, snapshot: &FeedSnapshot, ids: &[ProductId]) -> UpdateSummary {
        let outcomes: Vec<UpdateOutcome> = stream::iter(ids.iter().copied())
            .map(|id| self.apply(snapshot, id))
            .buffer_unordered(self.settings.max_concurrent_updates.max(1))
            .collect()
            .await;
        outcomes.iter().collect()
    }

    async fn apply(&self, snapshot: &FeedSnapshot, id: ProductId) -> UpdateOutcome {
        match self.try_apply(snapshot, id).await {
            Ok(outcome) => {
                if let UpdateOutcome::Skipped(reason) = &outcome {
                    tracing::debug!(product_id = id, %reason, "product skipped");
                }
                outcome
            }
            Err(e) => {
                tracing::warn!(product_id = id, error = %e, "stock update failed");
                UpdateOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_apply(
        &self,
        snapshot: &FeedSnapshot,
        id: ProductId,
    ) -> Result<UpdateOutcome, CatalogError> {
        let Some(product) = self.catalog.load_product(id).await? else {
            return Ok(UpdateOutcome::Skipped(SkipReason::ProductNotFound));
        };
        if !product.supplier_stocked {
            return Ok(UpdateOutcome::Skipped(SkipReason::NotSupplierStocked));
        }
        let Some(sku) = product.effective_sku() else {
            return Ok(UpdateOutcome::Skipped(SkipReason::NoSku));
        };
        if snapshot.is_empty() {
            return Ok(UpdateOutcome::Skipped(SkipReason::EmptyFeed));
        }
        let Some(supplier_qty) = snapshot.quantity_for(sku) else {
            return Ok(UpdateOutcome::Skipped(SkipReason::SkuNotInFeed));
        };

        let threshold = product.effective_threshold(self.settings.default_threshold);
        let decision = reconcile(&PolicyInput::for_product(&product, supplier_qty, threshold));

        if !decision.changed && product.manage_stock {
            return Ok(UpdateOutcome::Unchanged);
        }

        self.catalog
            .write_stock_state(
                id,
                &StockStateUpdate {
                    stock_status: decision.new_status,
                    backorders: decision.new_backorders,
                    manage_stock: true,
                },
            )
            .await?;

        tracing::info!(
            product_id = id,
            sku,
            supplier_qty,
            threshold,
            from = %product.stock_status,
            to = %decision.new_status,
            backorders = %decision.new_backorders,
            "stock status updated"
        );
        Ok(UpdateOutcome::Updated {
            from: product.stock_status,
            to: decision.new_status,
        })
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
