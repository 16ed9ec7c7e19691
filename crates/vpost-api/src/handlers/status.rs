//! Job status handler for progress polling.
//!
//! The status query service is read-only and fully decoupled from the
//! write path; clients poll it at an interval of their choosing.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vpost_models::{InputKind, JobId, JobStatus, Post};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters for the status endpoint.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Job id to look up. Required.
    #[serde(default)]
    pub id: Option<String>,
}

/// Job status response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    /// Job ID
    pub job_id: String,
    /// What kind of input was submitted
    pub input_kind: InputKind,
    /// Display string for the input
    pub input_summary: String,
    /// Current status: processing, complete, failed
    pub status: JobStatus,
    /// Error message if the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Extracted/source text, if the worker saved one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Generated posts, in creation order
    pub posts: Vec<Post>,
    /// When the job was created
    pub created_at: String,
    /// When the job was last updated
    pub updated_at: String,
}

/// GET /api/status?id=<job_id>
///
/// Returns:
/// - 200: job plus all its posts
/// - 400: missing id
/// - 404: unknown id
pub async fn get_job_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::validation("id query parameter is required"))?;

    let job_id = JobId::from_string(id);
    let job = state
        .store
        .get_job(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    let posts = state.store.posts_for_job(&job.id).await?;

    Ok(Json(JobStatusResponse {
        job_id: job.id.to_string(),
        input_kind: job.input_kind,
        input_summary: job.input_summary,
        status: job.status,
        error: job.error,
        transcript: job.transcript,
        posts,
        created_at: job.created_at.to_rfc3339(),
        updated_at: job.updated_at.to_rfc3339(),
    }))
}
