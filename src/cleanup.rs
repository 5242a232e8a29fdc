//! Weekly purge of everything that is not demo content.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use sqlx::SqlitePool;
use tokio::{sync::Notify, task::JoinHandle};

use crate::{
    config::CleanupSchedule,
    db_helpers::{purge_non_demo_content_in_db, seed_demo_data_in_db, CleanupReport},
    errors::RequestError,
};

/// First instant strictly after `now` that falls on the scheduled weekday and hour.
pub fn next_run(now: DateTime<Utc>, schedule: &CleanupSchedule) -> DateTime<Utc> {
    let start_of_day = now
        - Duration::seconds(i64::from(now.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(now.nanosecond()));
    let days_ahead = (7 + schedule.weekday.num_days_from_monday()
        - now.weekday().num_days_from_monday())
        % 7;
    let candidate = start_of_day
        + Duration::days(i64::from(days_ahead))
        + Duration::hours(i64::from(schedule.hour));
    if candidate <= now {
        candidate + Duration::weeks(1)
    } else {
        candidate
    }
}

pub struct CleanupJob {
    pool: SqlitePool,
    demo_password: String,
    running: AtomicBool,
}

/// Clears the in-flight flag when the run ends, whatever the outcome.
pub struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CleanupJob {
    pub fn new(pool: SqlitePool, demo_password: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            pool,
            demo_password: demo_password.into(),
            running: AtomicBool::new(false),
        })
    }

    pub fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(&self.running))
    }

    /// Purges and re-seeds. `Ok(None)` means a previous run is still going.
    pub async fn run_once(&self) -> Result<Option<CleanupReport>, RequestError> {
        let Some(_guard) = self.try_begin() else {
            tracing::warn!("cleanup still running, skipping this tick");
            return Ok(None);
        };
        let report = purge_non_demo_content_in_db(&self.pool).await?;
        tracing::info!(
            comments = report.comments,
            articles = report.articles,
            tags = report.tags,
            "cleanup finished"
        );
        seed_demo_data_in_db(&self.pool, &self.demo_password).await?;
        Ok(Some(report))
    }

    /// Runs on `schedule` until the returned handle is shut down.
    pub fn spawn(self: Arc<Self>, schedule: CleanupSchedule) -> CleanupHandle {
        let stop = Arc::new(Notify::new());
        let stopped = Arc::clone(&stop);
        let task = tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_run(now, &schedule);
                tracing::info!(next = %next, "next cleanup scheduled");
                tokio::select! {
                    _ = tokio::time::sleep((next - now).to_std().unwrap_or_default()) => {}
                    _ = stopped.notified() => break,
                }
                // Runs inline so that shutdown waits for a purge in progress.
                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "cleanup failed");
                }
            }
            tracing::info!("cleanup stopped");
        });
        CleanupHandle { stop, task }
    }
}

pub struct CleanupHandle {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// Stops scheduling and waits for the current run, if any, to finish.
    pub async fn shutdown(self) {
        self.stop.notify_one();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "cleanup task failed");
        }
    }
}
