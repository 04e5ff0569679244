//! Sync command handlers.

use stocksync_db::SyncRunCounts;
use stocksync_updater::{SyncEngine, SyncReport, UpdateOutcome};

/// Run one sync cycle recorded in `sync_runs` with trigger `cli`.
///
/// # Errors
///
/// Returns an error if the run record cannot be created or updated, or if
/// the cycle could not list tracked products.
pub(crate) async fn run_sync(pool: &sqlx::PgPool, engine: &SyncEngine) -> anyhow::Result<()> {
    let run = stocksync_db::create_sync_run(pool, "cli").await?;
    if let Err(e) = stocksync_db::start_sync_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, &e.to_string()).await;
        return Err(e.into());
    }

    let report = engine.run().await;

    if let Some(message) = &report.error {
        fail_run_best_effort(pool, run.id, message).await;
        anyhow::bail!("sync run {} failed: {message}", run.public_id);
    }

    let counts = SyncRunCounts::saturating(
        report.tracked,
        report.feed_entries,
        report.summary.updated,
    );
    stocksync_db::complete_sync_run(pool, run.id, counts).await?;

    println!("sync run {}", run.public_id);
    print!("{}", render_report(&report));
    Ok(())
}

/// Reconcile one product and print what happened.
///
/// # Errors
///
/// Returns an error if the catalog failed for this product.
pub(crate) async fn run_product_sync(engine: &SyncEngine, id: i64) -> anyhow::Result<()> {
    match engine.update_one(id).await {
        UpdateOutcome::Updated { from, to } if from == to => {
            println!("product {id}: stock management enabled, status {to}");
        }
        UpdateOutcome::Updated { from, to } => println!("product {id}: {from} -> {to}"),
        UpdateOutcome::Unchanged => println!("product {id}: already up to date"),
        UpdateOutcome::Skipped(reason) => println!("product {id}: skipped ({reason})"),
        UpdateOutcome::Failed(message) => anyhow::bail!("product {id}: {message}"),
    }
    Ok(())
}

/// Print the most recent sync runs, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = stocksync_db::list_sync_runs(pool, limit.max(1)).await?;
    if runs.is_empty() {
        println!("no sync runs recorded yet");
        return Ok(());
    }

    println!(
        "{:<21}{:<11}{:<11}{:>9}{:>9}{:>9}  ERROR",
        "CREATED", "TRIGGER", "STATUS", "TRACKED", "FEED", "UPDATED"
    );
    for run in &runs {
        println!(
            "{:<21}{:<11}{:<11}{:>9}{:>9}{:>9}  {}",
            run.created_at.format("%Y-%m-%d %H:%M:%S"),
            run.trigger_source,
            run.status,
            run.tracked_products,
            run.feed_entries,
            run.records_processed,
            run.error_message.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: &str) {
    if let Err(mark_err) = stocksync_db::fail_sync_run(pool, run_id, message).await {
        tracing::error!(run_id, error = %mark_err, "failed to mark sync run as failed");
    }
}

pub(crate) fn render_report(report: &SyncReport) -> String {
    let elapsed = report.finished_at - report.started_at;
    format!(
        "tracked {}, feed entries {}\n\
         updated {}, unchanged {}, skipped {}, failed {}\n\
         took {} ms\n",
        report.tracked,
        report.feed_entries,
        report.summary.updated,
        report.summary.unchanged,
        report.summary.skipped,
        report.summary.failed,
        elapsed.num_milliseconds(),
    )
}
