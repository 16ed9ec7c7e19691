//! Per-job temporary filesystem staging.
//!
//! A job may stage an uploaded file before the worker runs, and the
//! worker leaves a `<job_id>_transcript.txt` sidecar next to its
//! generated media. Both are request-scoped and must be gone after the
//! job reaches any terminal state. Generated media itself (clips, page
//! images) is output, not staging, and is left in place.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use vpost_models::JobId;

/// Tracks the temporary files tied to one job.
#[derive(Debug, Clone)]
pub struct JobStaging {
    job_id: JobId,
    upload: Option<PathBuf>,
    transcript: PathBuf,
}

impl JobStaging {
    pub fn new(generated_dir: &Path, job_id: &JobId) -> Self {
        Self {
            job_id: job_id.clone(),
            upload: None,
            transcript: generated_dir.join(format!("{job_id}_transcript.txt")),
        }
    }

    /// Record a staged upload to delete on cleanup.
    pub fn with_upload(mut self, path: PathBuf) -> Self {
        self.upload = Some(path);
        self
    }

    pub fn upload_path(&self) -> Option<&Path> {
        self.upload.as_deref()
    }

    /// Read the transcript sidecar the worker may have written.
    pub async fn read_transcript(&self) -> Option<String> {
        match fs::read_to_string(&self.transcript).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }

    /// Remove all staged files. Idempotent: missing files are fine.
    pub async fn cleanup(&self) {
        let mut targets = vec![self.transcript.clone()];
        if let Some(upload) = &self.upload {
            targets.push(upload.clone());
        }

        for path in targets {
            match fs::remove_file(&path).await {
                Ok(()) => debug!(job_id = %self.job_id, path = %path.display(), "Removed staged file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    job_id = %self.job_id,
                    path = %path.display(),
                    "Failed to remove staged file: {}", e
                ),
            }
        }
    }
}
