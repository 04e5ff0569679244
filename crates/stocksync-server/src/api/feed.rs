use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stocksync_feed::{DataLossReport, FeedSnapshot, ParseStats, QuantitySummary};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct FeedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct FeedEntryItem {
    sku: String,
    quantity: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct FeedData {
    count: usize,
    fetched_at: DateTime<Utc>,
    expired: bool,
    entries: Vec<FeedEntryItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct FeedStatsData {
    entries: usize,
    fetched_at: DateTime<Utc>,
    expired: bool,
    stats: ParseStats,
    data_loss: DataLossReport,
    quantities: QuantitySummary,
}

impl FeedStatsData {
    fn from_snapshot(snapshot: &FeedSnapshot) -> Self {
        Self {
            entries: snapshot.len(),
            fetched_at: snapshot.fetched_at(),
            expired: snapshot.is_expired(),
            stats: *snapshot.stats(),
            data_loss: snapshot.data_loss(),
            quantities: snapshot.quantity_summary(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ClearedData {
    cleared: bool,
}

/// Cached entries sorted by SKU, downloading the feed if needed.
pub(super) async fn show_feed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<FeedQuery>,
) -> Json<ApiResponse<FeedData>> {
    let snapshot = state.engine.feed().get_feed(false).await;

    let mut entries: Vec<FeedEntryItem> = snapshot
        .entries()
        .iter()
        .map(|(sku, quantity)| FeedEntryItem {
            sku: sku.clone(),
            quantity: *quantity,
        })
        .collect();
    entries.sort_by(|a, b| a.sku.cmp(&b.sku));
    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }

    ApiResponse::new(
        FeedData {
            count: snapshot.len(),
            fetched_at: snapshot.fetched_at(),
            expired: snapshot.is_expired(),
            entries,
        },
        req_id.0,
    )
}

pub(super) async fn feed_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<FeedStatsData>>, ApiError> {
    let Some(snapshot) = state.engine.feed().snapshot().await else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            "no feed has been parsed yet",
        ));
    };
    Ok(ApiResponse::new(
        FeedStatsData::from_snapshot(&snapshot),
        req_id.0,
    ))
}

pub(super) async fn refresh_feed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<FeedStatsData>> {
    let snapshot = state.engine.feed().get_feed(true).await;
    ApiResponse::new(FeedStatsData::from_snapshot(&snapshot), req_id.0)
}

pub(super) async fn clear_feed_cache(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ClearedData>> {
    state.engine.feed().clear().await;
    ApiResponse::new(ClearedData { cleared: true }, req_id.0)
}
