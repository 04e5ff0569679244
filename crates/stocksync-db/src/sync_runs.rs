//! Database operations for `sync_runs`.
//!
//! A run moves `queued` → `running` → `succeeded` | `failed`. Every
//! transition is guarded by the expected current status so a run can never
//! be completed twice or restarted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// `scheduler`, `manual` or `cli`.
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub tracked_products: i32,
    pub feed_entries: i32,
    /// Products whose stock state was written.
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Totals stored when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncRunCounts {
    pub tracked_products: i32,
    pub feed_entries: i32,
    pub records_processed: i32,
}

impl SyncRunCounts {
    /// Converts `usize` tallies, saturating at `i32::MAX`.
    #[must_use]
    pub fn saturating(tracked: usize, feed_entries: usize, processed: usize) -> Self {
        let clamp = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        Self {
            tracked_products: clamp(tracked),
            feed_entries: clamp(feed_entries),
            records_processed: clamp(processed),
        }
    }
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
                           tracked_products, feed_entries, records_processed, error_message, \
                           created_at";

/// Creates a new run in `queued` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including an unknown
/// `trigger_source`, rejected by a check constraint).
pub async fn create_sync_run(pool: &PgPool, trigger_source: &str) -> Result<SyncRunRow, DbError> {
    let row = sqlx::query_as::<_, SyncRunRow>(&format!(
        "INSERT INTO sync_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a `queued` run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not queued,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "queued",
        });
    }
    Ok(())
}

/// Marks a `running` run as `succeeded` and stores its totals.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not running,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    counts: SyncRunCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             tracked_products = $1, feed_entries = $2, records_processed = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(counts.tracked_products)
    .bind(counts.feed_entries)
    .bind(counts.records_processed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a `running` run as `failed` with `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not running,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`].
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, DbError> {
    sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM sync_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM sync_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
