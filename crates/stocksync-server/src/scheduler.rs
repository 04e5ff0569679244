//! Recurring sync job.
//!
//! [`SyncSchedule`] owns a running [`JobScheduler`] and at most one sync job.
//! The handle must be kept alive for the lifetime of the process; dropping
//! the scheduler stops every job.

use std::sync::Arc;

use sqlx::PgPool;
use stocksync_updater::SyncEngine;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use crate::runs::run_recorded_sync;

/// Minute steps that repeat evenly across the hour.
const MINUTE_STEPS: [u32; 11] = [1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30];

/// Six-field cron expression firing every `interval_minutes` at second 0.
/// Intervals that do not divide the hour round down to the nearest step.
pub(crate) fn cron_expression(interval_minutes: u32) -> String {
    let step = MINUTE_STEPS
        .iter()
        .copied()
        .rev()
        .find(|step| *step <= interval_minutes)
        .unwrap_or(1);
    format!("0 */{step} * * * *")
}

pub struct SyncSchedule {
    scheduler: JobScheduler,
    pool: PgPool,
    engine: Arc<SyncEngine>,
    interval_minutes: u32,
    job_id: Mutex<Option<Uuid>>,
}

impl SyncSchedule {
    /// Creates and starts an empty scheduler. Call [`schedule`](Self::schedule)
    /// to register the sync job.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler cannot be started.
    pub async fn new(
        pool: PgPool,
        engine: Arc<SyncEngine>,
        interval_minutes: u32,
    ) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        Ok(Self {
            scheduler,
            pool,
            engine,
            interval_minutes,
            job_id: Mutex::new(None),
        })
    }

    /// Registers the recurring sync job, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the job cannot be built or added.
    pub async fn schedule(&self) -> Result<Uuid, JobSchedulerError> {
        let mut job_id = self.job_id.lock().await;
        if let Some(previous) = job_id.take() {
            self.scheduler.remove(&previous).await?;
        }

        let pool = self.pool.clone();
        let engine = Arc::clone(&self.engine);
        let cron = cron_expression(self.interval_minutes);

        let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
            let pool = pool.clone();
            let engine = Arc::clone(&engine);

            Box::pin(async move {
                tracing::info!("scheduler: starting supplier stock sync");
                match run_recorded_sync(&pool, &engine, "scheduler").await {
                    Ok(recorded) => tracing::info!(
                        run_id = %recorded.run_id,
                        updated = recorded.report.summary.updated,
                        "scheduler: supplier stock sync complete"
                    ),
                    Err(e) => {
                        tracing::error!(error = %e, "scheduler: could not record sync run");
                    }
                }
            })
        })?;

        let id = self.scheduler.add(job).await?;
        *job_id = Some(id);
        tracing::info!(cron = %cron, "scheduler: supplier stock sync scheduled");
        Ok(id)
    }

    /// Removes the sync job. Returns `false` if none was scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the job cannot be removed.
    pub async fn unschedule(&self) -> Result<bool, JobSchedulerError> {
        let Some(id) = self.job_id.lock().await.take() else {
            return Ok(false);
        };
        self.scheduler.remove(&id).await?;
        tracing::info!("scheduler: supplier stock sync unscheduled");
        Ok(true)
    }

    /// Unschedules the job and stops the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if shutdown fails.
    pub async fn shutdown(&self) -> Result<(), JobSchedulerError> {
        self.unschedule().await?;
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use stocksync_updater::InMemoryCatalog;

    use super::*;
    use crate::test_support::{engine_with, lazy_pool, StaticSource};

    #[test]
    fn cron_expression_uses_interval() {
        assert_eq!(cron_expression(30), "0 */30 * * * *");
        assert_eq!(cron_expression(5), "0 */5 * * * *");
    }

    #[test]
    fn cron_expression_rounds_to_an_even_step() {
        assert_eq!(cron_expression(0), "0 */1 * * * *");
        assert_eq!(cron_expression(7), "0 */6 * * * *");
        assert_eq!(cron_expression(45), "0 */30 * * * *");
        assert_eq!(cron_expression(90), "0 */30 * * * *");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn schedule_replaces_and_unschedule_removes() {
        let engine = engine_with(Arc::new(InMemoryCatalog::new()), StaticSource::csv(""));
        let schedule = SyncSchedule::new(lazy_pool(), engine, 30)
            .await
            .expect("scheduler");
        assert!(!schedule.unschedule().await.expect("nothing to unschedule"));

        let first = schedule.schedule().await.expect("schedule");
        let second = schedule.schedule().await.expect("reschedule");
        assert_ne!(first, second);

        assert!(schedule.unschedule().await.expect("unschedule"));
        assert!(!schedule.unschedule().await.expect("second unschedule"));

        schedule.shutdown().await.expect("shutdown");
    }
}
