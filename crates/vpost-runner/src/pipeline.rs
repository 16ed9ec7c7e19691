//! The per-job pipeline: supervise one worker invocation, record the
//! terminal status, release staging.
//!
//! One pipeline run is spawned per submitted job; failures terminate in
//! the job row and never escape to other jobs or the server task.

use tracing::{error, info};

use vpost_models::{JobId, WorkerOperation};
use vpost_store::JobStore;

use crate::command::{WorkerConfig, WorkerInvocation};
use crate::error::{RunnerError, RunnerResult};
use crate::ingest::ResultIngestor;
use crate::output::{self, ClipOutput};
use crate::staging::JobStaging;
use crate::supervisor::{WorkerOutcome, WorkerSupervisor};

/// Fixed message recorded when the supervisor's wall-clock timer fires.
pub const TIMEOUT_MESSAGE: &str = "Processing timed out and the worker was terminated.";

/// Runs jobs against the configured worker.
#[derive(Clone)]
pub struct JobPipeline {
    store: JobStore,
    config: WorkerConfig,
}

impl JobPipeline {
    pub fn new(store: JobStore, config: WorkerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one job to its terminal status.
    ///
    /// Never returns an error: persistence failures are logged and left
    /// for the timeout reaper to finalize. Staging is released exactly
    /// once, on every terminal path.
    pub async fn run(&self, job_id: JobId, invocation: WorkerInvocation, staging: JobStaging) {
        info!(
            job_id = %job_id,
            operation = %invocation.operation,
            worker = %self.config.program_display(),
            "Spawning worker"
        );

        let supervisor = WorkerSupervisor::new(self.config.timeout);
        let outcome = supervisor.run(self.config.command(&invocation)).await;

        let result = match outcome {
            WorkerOutcome::SpawnFailed { message } => {
                self.store.fail_job(&job_id, &message).await.map(|_| ())
            }
            WorkerOutcome::TimedOut => self
                .store
                .fail_job(&job_id, TIMEOUT_MESSAGE)
                .await
                .map(|_| ()),
            WorkerOutcome::Exited(exit) => {
                ResultIngestor::new(self.store.clone())
                    .ingest(&job_id, &exit, &staging)
                    .await
            }
        };

        if let Err(e) = result {
            // The reaper is the backstop for jobs stuck by a store failure.
            error!(job_id = %job_id, "Failed to record job outcome: {}", e);
        }

        staging.cleanup().await;
    }

    /// Run a synchronous clip-extract invocation for an existing post.
    ///
    /// The quote is the payload; the worker locates it in the job's
    /// already-processed media and cuts a clip. The job and post rows
    /// are untouched on failure.
    pub async fn extract_clip(
        &self,
        job_id: &JobId,
        quote: &str,
        model: &str,
    ) -> RunnerResult<ClipOutput> {
        let invocation =
            WorkerInvocation::new(WorkerOperation::ClipExtract, quote, job_id.clone(), model);

        let supervisor = WorkerSupervisor::new(self.config.timeout);
        match supervisor.run(self.config.command(&invocation)).await {
            WorkerOutcome::SpawnFailed { message } => Err(RunnerError::Spawn(message)),
            WorkerOutcome::TimedOut => Err(RunnerError::Timeout(self.config.timeout.as_secs())),
            WorkerOutcome::Exited(exit) => {
                if exit.is_success() {
                    Ok(output::parse_clip_output(&exit.stdout)?)
                } else {
                    Err(RunnerError::Worker(output::build_error_message(
                        &exit.stderr,
                        exit.code,
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vpost_models::{InputKind, Job, JobStatus};

    async fn scratch() -> (tempfile::TempDir, JobStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let store = JobStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();
        (dir, store)
    }

    // Stub worker: a shell script that ignores the positional contract
    // and just replays canned behavior.
    fn stub_worker(dir: &tempfile::TempDir, script: &str, timeout: Duration) -> WorkerConfig {
        WorkerConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "worker".to_string()],
            timeout,
            generated_dir: dir.path().to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_successful_run_completes_job_and_cleans_staging() {
        let (dir, store) = scratch().await;
        let job = Job::new(InputKind::Text, "text", None);
        store.create_job(&job).await.unwrap();

        let upload = dir.path().join("staged.txt");
        tokio::fs::write(&upload, "staged").await.unwrap();

        let config = stub_worker(
            &dir,
            r#"echo '{"status":"complete","posts":[{"post_text":"p","source_quote":"q"}]}'"#,
            Duration::from_secs(10),
        );
        let pipeline = JobPipeline::new(store.clone(), config);
        let staging = JobStaging::new(dir.path(), &job.id).with_upload(upload.clone());
        let invocation = WorkerInvocation::new(
            WorkerOperation::Text,
            "text",
            job.id.clone(),
            "phi",
        );

        pipeline.run(job.id.clone(), invocation, staging).await;

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Complete);
        assert_eq!(store.posts_for_job(&job.id).await.unwrap().len(), 1);
        assert!(!upload.exists());
    }

    #[tokio::test]
    async fn test_worker_failure_records_scraped_error() {
        let (dir, store) = scratch().await;
        let job = Job::new(InputKind::RemoteMedia, "url", None);
        store.create_job(&job).await.unwrap();

        let config = stub_worker(
            &dir,
            r#"echo '{"error":"bad url"}' >&2; exit 2"#,
            Duration::from_secs(10),
        );
        let pipeline = JobPipeline::new(store.clone(), config);
        let staging = JobStaging::new(dir.path(), &job.id);
        let invocation =
            WorkerInvocation::new(WorkerOperation::RemoteMedia, "url", job.id.clone(), "phi");

        pipeline.run(job.id.clone(), invocation, staging).await;

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("bad url (exit code: 2)"));
    }

    #[tokio::test]
    async fn test_timeout_fails_job_with_fixed_message_and_cleans_staging() {
        let (dir, store) = scratch().await;
        let job = Job::new(InputKind::Text, "text", None);
        store.create_job(&job).await.unwrap();

        let upload = dir.path().join("staged.txt");
        tokio::fs::write(&upload, "staged").await.unwrap();

        let config = stub_worker(&dir, "sleep 30", Duration::from_millis(100));
        let pipeline = JobPipeline::new(store.clone(), config);
        let staging = JobStaging::new(dir.path(), &job.id).with_upload(upload.clone());
        let invocation =
            WorkerInvocation::new(WorkerOperation::Text, "text", job.id.clone(), "phi");

        pipeline.run(job.id.clone(), invocation, staging).await;

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some(TIMEOUT_MESSAGE));
        assert!(!upload.exists());
    }

    #[tokio::test]
    async fn test_spawn_failure_fails_job_without_invoking_ingestion() {
        let (dir, store) = scratch().await;
        let job = Job::new(InputKind::Text, "text", None);
        store.create_job(&job).await.unwrap();

        let config = WorkerConfig {
            program: "/nonexistent/worker".to_string(),
            args: vec![],
            timeout: Duration::from_secs(5),
            generated_dir: dir.path().to_path_buf(),
        };
        let pipeline = JobPipeline::new(store.clone(), config);
        let staging = JobStaging::new(dir.path(), &job.id);
        let invocation =
            WorkerInvocation::new(WorkerOperation::Text, "text", job.id.clone(), "phi");

        pipeline.run(job.id.clone(), invocation, staging).await;

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert!(loaded.error.unwrap().starts_with("Failed to start worker"));
        assert!(store.posts_for_job(&job.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_clip_success_and_failure() {
        let (dir, store) = scratch().await;
        let job = Job::new(InputKind::RemoteMedia, "url", None);
        store.create_job(&job).await.unwrap();

        let ok = stub_worker(
            &dir,
            r#"echo '{"status":"complete","media_path":"/generated/p.mp4","start_time":4.0,"end_time":19.5}'"#,
            Duration::from_secs(10),
        );
        let clip = JobPipeline::new(store.clone(), ok)
            .extract_clip(&job.id, "some quote", "phi")
            .await
            .unwrap();
        assert_eq!(clip.media_path, "/generated/p.mp4");
        assert_eq!(clip.start_time, 4.0);

        let bad = stub_worker(
            &dir,
            r#"echo '{"error":"Quote not found."}' >&2; exit 1"#,
            Duration::from_secs(10),
        );
        let err = JobPipeline::new(store, bad)
            .extract_clip(&job.id, "missing quote", "phi")
            .await
            .unwrap_err();
        match err {
            RunnerError::Worker(message) => {
                assert_eq!(message, "Quote not found. (exit code: 1)");
            }
            other => panic!("expected Worker error, got {other:?}"),
        }
    }
}
