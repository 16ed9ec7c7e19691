//! Result ingestion: interpreting a worker exit into a terminal job
//! status.
//!
//! Spawn failures and timeouts are finalized by the pipeline before the
//! ingestor is ever involved; this module only sees natural exits.

use tracing::{info, warn};

use vpost_models::JobId;
use vpost_store::{JobStore, StoreResult};

use crate::output::{self, EXCERPT_LIMIT};
use crate::staging::JobStaging;
use crate::supervisor::WorkerExit;

/// Interprets worker exits and persists the result.
#[derive(Clone)]
pub struct ResultIngestor {
    store: JobStore,
}

impl ResultIngestor {
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    /// Persist the terminal status for a natural worker exit.
    ///
    /// Success requires exit code 0 and a parseable, non-empty stdout
    /// payload; everything else fails the job with a message scraped
    /// from stderr. Malformed output is a processing failure, never a
    /// crash.
    pub async fn ingest(
        &self,
        job_id: &JobId,
        exit: &WorkerExit,
        staging: &JobStaging,
    ) -> StoreResult<()> {
        if let Some(signal) = exit.signal {
            warn!(job_id = %job_id, signal, "Worker terminated by signal");
        }

        if exit.is_success() {
            match output::parse_worker_output(&exit.stdout) {
                Ok(posts) => {
                    let transcript = staging.read_transcript().await;
                    self.store
                        .complete_job(job_id, transcript.as_deref(), &posts)
                        .await?;
                    info!(job_id = %job_id, posts = posts.len(), "Ingested worker output");
                }
                Err(e) => {
                    let message = format!(
                        "Failed to parse worker output: {e}. Raw output: {}",
                        output::bounded(exit.stdout.trim(), EXCERPT_LIMIT)
                    );
                    self.store.fail_job(job_id, &message).await?;
                }
            }
        } else {
            let message = output::build_error_message(&exit.stderr, exit.code);
            self.store.fail_job(job_id, &message).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpost_models::{InputKind, Job, JobStatus};

    async fn scratch() -> (tempfile::TempDir, JobStore, Job) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let store = JobStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();

        let job = Job::new(InputKind::Text, "some text", None);
        store.create_job(&job).await.unwrap();
        (dir, store, job)
    }

    fn exit(code: i32, stdout: &str, stderr: &str) -> WorkerExit {
        WorkerExit {
            code: Some(code),
            signal: None,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[tokio::test]
    async fn test_successful_exit_persists_posts_and_transcript() {
        let (dir, store, job) = scratch().await;
        let ingestor = ResultIngestor::new(store.clone());

        let transcript_path = dir.path().join(format!("{}_transcript.txt", job.id));
        tokio::fs::write(&transcript_path, "full transcript").await.unwrap();
        let staging = JobStaging::new(dir.path(), &job.id);

        let stdout = r#"{"status":"complete","posts":[
            {"post_text":"one","source_quote":"q1"},
            {"post_text":"two","source_quote":"q2","page_number":7}
        ]}"#;
        ingestor
            .ingest(&job.id, &exit(0, stdout, ""), &staging)
            .await
            .unwrap();

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Complete);
        assert_eq!(loaded.transcript.as_deref(), Some("full transcript"));

        let posts = store.posts_for_job(&job.id).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].page_number, Some(7));
    }

    #[tokio::test]
    async fn test_malformed_stdout_fails_with_parse_message_and_no_posts() {
        let (dir, store, job) = scratch().await;
        let ingestor = ResultIngestor::new(store.clone());
        let staging = JobStaging::new(dir.path(), &job.id);

        ingestor
            .ingest(&job.id, &exit(0, "definitely not json", ""), &staging)
            .await
            .unwrap();

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        let error = loaded.error.unwrap();
        assert!(error.starts_with("Failed to parse worker output"));
        assert!(error.contains("definitely not json"));
        assert!(store.posts_for_job(&job.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_stdout_with_code_zero_is_a_failure() {
        let (dir, store, job) = scratch().await;
        let ingestor = ResultIngestor::new(store.clone());
        let staging = JobStaging::new(dir.path(), &job.id);

        ingestor
            .ingest(&job.id, &exit(0, "   \n", "warning: nothing produced"), &staging)
            .await
            .unwrap();

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("warning: nothing produced"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_scrapes_structured_stderr() {
        let (dir, store, job) = scratch().await;
        let ingestor = ResultIngestor::new(store.clone());
        let staging = JobStaging::new(dir.path(), &job.id);

        let stderr = "downloading...\n{\"error\":\"bad url\"}\n";
        ingestor
            .ingest(&job.id, &exit(2, "", stderr), &staging)
            .await
            .unwrap();

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.error.as_deref(), Some("bad url (exit code: 2)"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_scrapes_plain_stderr() {
        let (dir, store, job) = scratch().await;
        let ingestor = ResultIngestor::new(store.clone());
        let staging = JobStaging::new(dir.path(), &job.id);

        ingestor
            .ingest(&job.id, &exit(1, "", "Traceback...\nValueError: x\n"), &staging)
            .await
            .unwrap();

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.error.as_deref(), Some("ValueError: x (exit code: 1)"));
    }
}
