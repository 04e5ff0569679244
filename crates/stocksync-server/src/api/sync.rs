use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stocksync_core::ProductId;
use stocksync_updater::{SyncReport, UpdateOutcome};
use uuid::Uuid;

use crate::{middleware::RequestId, runs::run_recorded_sync};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SyncRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunItem {
    sync_run_id: Uuid,
    trigger_source: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    tracked_products: i32,
    feed_entries: i32,
    records_processed: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<stocksync_db::SyncRunRow> for SyncRunItem {
    fn from(row: stocksync_db::SyncRunRow) -> Self {
        Self {
            sync_run_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            tracked_products: row.tracked_products,
            feed_entries: row.feed_entries,
            records_processed: row.records_processed,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct TriggeredSync {
    sync_run_id: Uuid,
    report: SyncReport,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductSyncData {
    product_id: ProductId,
    #[serde(flatten)]
    outcome: UpdateOutcome,
}

/// Runs one cycle now, recorded with trigger `manual`.
pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<TriggeredSync>>, ApiError> {
    let recorded = run_recorded_sync(&state.pool, &state.engine, "manual")
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        TriggeredSync {
            sync_run_id: recorded.run_id,
            report: recorded.report,
        },
        req_id.0,
    ))
}

pub(super) async fn sync_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<ProductId>,
) -> Json<ApiResponse<ProductSyncData>> {
    let outcome = state.engine.update_one(product_id).await;
    ApiResponse::new(
        ProductSyncData {
            product_id,
            outcome,
        },
        req_id.0,
    )
}

pub(super) async fn list_sync_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncRunsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRunItem>>>, ApiError> {
    let rows = stocksync_db::list_sync_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        rows.into_iter().map(SyncRunItem::from).collect(),
        req_id.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocksync_core::StockStatus;
    use stocksync_updater::SkipReason;

    #[test]
    fn product_sync_data_flattens_outcome() {
        let data = ProductSyncData {
            product_id: 7,
            outcome: UpdateOutcome::Updated {
                from: StockStatus::OutOfStock,
                to: StockStatus::OnBackorder,
            },
        };
        let json = serde_json::to_value(&data).expect("serialize");
        assert_eq!(json["product_id"], 7);
        assert_eq!(json["outcome"], "updated");
        assert_eq!(json["detail"]["to"], "on_backorder");
    }

    #[test]
    fn skipped_outcome_serializes_reason() {
        let data = ProductSyncData {
            product_id: 3,
            outcome: UpdateOutcome::Skipped(SkipReason::SkuNotInFeed),
        };
        let json = serde_json::to_value(&data).expect("serialize");
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["detail"], "sku_not_in_feed");
    }
}
