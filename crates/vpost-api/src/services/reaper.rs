//! Background service that fails stale in-flight jobs.
//!
//! The worker supervisor enforces its own timeout, but its timers live
//! in memory: if the orchestrating process restarts or crashes, jobs
//! are left in processing forever. This sweep rebuilds correctness
//! purely from persisted timestamps, independent of any live
//! supervisor.

use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use vpost_store::{JobStore, StoreResult};

/// Fixed message recorded for reaped jobs.
const REAPED_MESSAGE: &str = "Processing timed out. Please try again.";

/// Timeout reaper service.
pub struct TimeoutReaper {
    store: JobStore,
    /// A processing job older than this is considered dead
    threshold: Duration,
    /// Time between sweeps
    sweep_interval: Duration,
    enabled: bool,
}

impl TimeoutReaper {
    /// Create a new reaper. `threshold` should be at least the worker
    /// timeout, so a live supervisor always gets the first chance to
    /// finalize its own job.
    pub fn new(store: JobStore, threshold: Duration, sweep_interval: Duration) -> Self {
        let enabled = std::env::var("ENABLE_TIMEOUT_REAPER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Self {
            store,
            threshold,
            sweep_interval,
            enabled,
        }
    }

    /// Start the background sweep loop.
    ///
    /// Runs indefinitely; spawn as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Timeout reaper is disabled");
            return;
        }

        info!(
            "Starting timeout reaper (threshold: {:?}, interval: {:?})",
            self.threshold, self.sweep_interval
        );

        let mut ticker = interval(self.sweep_interval);

        loop {
            ticker.tick().await;

            match self.check_once().await {
                Ok(0) => {}
                Ok(reaped) => info!("Timeout reaper failed {} stale job(s)", reaped),
                Err(e) => error!("Timeout reaper sweep error: {}", e),
            }
        }
    }

    /// Run a single sweep. Idempotent: already-terminal jobs are never
    /// touched. Returns the number of jobs transitioned to failed.
    pub async fn check_once(&self) -> StoreResult<u64> {
        self.store.reap_stale(self.threshold, REAPED_MESSAGE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpost_models::{InputKind, Job, JobStatus};

    async fn scratch_store() -> (tempfile::TempDir, JobStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let store = JobStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_reaper_fails_stale_jobs_and_is_idempotent() {
        let (_dir, store) = scratch_store().await;

        let stuck = Job::new(InputKind::RemoteMedia, "u", None);
        store.create_job(&stuck).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let reaper = TimeoutReaper::new(
            store.clone(),
            Duration::from_millis(1),
            Duration::from_secs(60),
        );

        assert_eq!(reaper.check_once().await.unwrap(), 1);
        let loaded = store.get_job(&stuck.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some(REAPED_MESSAGE));

        // A second sweep finds nothing to do.
        assert_eq!(reaper.check_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reaper_spares_fresh_and_terminal_jobs() {
        let (_dir, store) = scratch_store().await;

        let fresh = Job::new(InputKind::Text, "t", None);
        store.create_job(&fresh).await.unwrap();

        let done = Job::new(InputKind::Text, "t2", None);
        store.create_job(&done).await.unwrap();
        store.complete_job(&done.id, None, &[]).await.unwrap();

        let reaper = TimeoutReaper::new(
            store.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(60),
        );
        assert_eq!(reaper.check_once().await.unwrap(), 0);

        assert_eq!(
            store.get_job(&fresh.id).await.unwrap().unwrap().status,
            JobStatus::Processing
        );
        assert_eq!(
            store.get_job(&done.id).await.unwrap().unwrap().status,
            JobStatus::Complete
        );
    }
}
