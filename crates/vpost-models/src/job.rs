//! Job definitions for content processing.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::InputKind;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
///
/// Submission starts the worker immediately, so there is no separate
/// queued state. Transitions are monotonic: once a job leaves
/// `Processing` it never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Worker is running (or about to be spawned)
    #[default]
    Processing,
    /// Worker finished and posts were persisted
    Complete,
    /// Worker failed, timed out, or could not be started
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a persisted status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(JobStatus::Processing),
            "complete" => Some(JobStatus::Complete),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One content-processing request and its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// What kind of input was submitted
    pub input_kind: InputKind,

    /// Display string for the input (URL, filename, or truncated text).
    /// Never used for identity.
    pub input_summary: String,

    /// Deterministic hash of the exact input bytes/text/URL.
    /// None only if fingerprinting was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_fingerprint: Option<String>,

    /// Current lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Human-readable failure message, set only when status is failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Extracted/source text saved by the worker for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new job in the processing state.
    pub fn new(
        input_kind: InputKind,
        input_summary: impl Into<String>,
        content_fingerprint: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            input_kind,
            input_summary: input_summary.into(),
            content_fingerprint,
            status: JobStatus::Processing,
            error: None,
            transcript: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the job as complete.
    pub fn complete(mut self) -> Self {
        self.status = JobStatus::Complete;
        self.error = None;
        self.updated_at = Utc::now();
        self
    }

    /// Mark the job as failed.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = Job::new(
            InputKind::RemoteMedia,
            "https://youtube.com/watch?v=abc",
            Some("deadbeef".to_string()),
        );

        assert_eq!(job.input_kind, InputKind::RemoteMedia);
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.error.is_none());
        assert!(!job.status.is_terminal());
    }

    #[test]
    fn test_job_transitions() {
        let job = Job::new(InputKind::Text, "hello", None);

        let failed = job.clone().fail("boom");
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        let completed = job.complete();
        assert_eq!(completed.status, JobStatus::Complete);
        assert!(completed.error.is_none());
        assert!(completed.status.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [JobStatus::Processing, JobStatus::Complete, JobStatus::Failed] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("pending"), None);
    }
}
