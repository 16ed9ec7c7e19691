//! On-demand clip extraction for an existing post.
//!
//! Runs the worker synchronously with the `clip-extract` operation and
//! attaches the resulting media path and bounds to the post. The same
//! ingestion discipline as the main pipeline applies: stdout carries
//! the structured result, stderr carries the scraped failure message.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use vpost_models::{JobId, JobStatus, Post, PostId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Clip extraction request.
#[derive(Debug, Deserialize)]
pub struct ClipRequest {
    pub job_id: String,
    pub post_id: String,
    pub quote: String,
}

/// POST /api/clip
///
/// Returns the updated post, or:
/// - 400: missing quote, or post not owned by the job
/// - 404: unknown job or post
/// - 502: the worker could not produce a clip
pub async fn extract_clip(
    State(state): State<AppState>,
    Json(request): Json<ClipRequest>,
) -> ApiResult<Json<Post>> {
    if request.quote.trim().is_empty() {
        return Err(ApiError::validation("quote is required"));
    }

    let job_id = JobId::from_string(request.job_id);
    let job = state
        .store
        .get_job(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    if job.status != JobStatus::Complete {
        return Err(ApiError::bad_request("Job has no completed results"));
    }

    let post_id = PostId::from_string(request.post_id);
    let post = state
        .store
        .get_post(&post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    if post.job_id != job.id {
        return Err(ApiError::bad_request("Post does not belong to this job"));
    }

    let clip = state
        .pipeline
        .extract_clip(&job.id, request.quote.trim(), &state.config.default_model)
        .await?;

    state
        .store
        .attach_clip(
            &post.id,
            &clip.media_path,
            clip.start_time,
            clip.end_time,
            clip.quote_snippet.as_deref(),
        )
        .await?;

    info!(job_id = %job.id, post_id = %post.id, "Attached clip to post");

    let updated = state
        .store
        .get_post(&post.id)
        .await?
        .ok_or_else(|| ApiError::internal("Post disappeared after update"))?;
    Ok(Json(updated))
}
