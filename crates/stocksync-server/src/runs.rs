//! Sync cycles recorded in `sync_runs`.

use sqlx::PgPool;
use stocksync_db::{DbError, SyncRunCounts};
use stocksync_updater::{SyncEngine, SyncReport};
use uuid::Uuid;

#[derive(Debug)]
pub(crate) struct RecordedSync {
    pub run_id: Uuid,
    pub report: SyncReport,
}

/// Runs one sync cycle inside a `sync_runs` record for `trigger_source`.
///
/// A cycle that could not list tracked products is stored as `failed`; the
/// report is still returned.
pub(crate) async fn run_recorded_sync(
    pool: &PgPool,
    engine: &SyncEngine,
    trigger_source: &'static str,
) -> Result<RecordedSync, DbError> {
    let run = stocksync_db::create_sync_run(pool, trigger_source).await?;
    if let Err(e) = stocksync_db::start_sync_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, &e.to_string()).await;
        return Err(e);
    }

    let report = engine.run().await;

    match &report.error {
        Some(message) => fail_run_best_effort(pool, run.id, message).await,
        None => {
            let counts = SyncRunCounts::saturating(
                report.tracked,
                report.feed_entries,
                report.summary.updated,
            );
            stocksync_db::complete_sync_run(pool, run.id, counts).await?;
        }
    }

    Ok(RecordedSync {
        run_id: run.public_id,
        report,
    })
}

async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: &str) {
    if let Err(mark_err) = stocksync_db::fail_sync_run(pool, run_id, message).await {
        tracing::error!(run_id, error = %mark_err, "failed to mark sync run as failed");
    }
}
