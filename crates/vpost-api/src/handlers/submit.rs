//! Job submission handler.
//!
//! Validates the multipart request, resolves fingerprint dedup, creates
//! the job row, and fires the pipeline without waiting for the worker:
//! response latency is independent of worker runtime.

use std::path::PathBuf;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use vpost_models::{fingerprint_bytes, fingerprint_str, InputKind, Job};
use vpost_runner::{JobStaging, WorkerInvocation};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Cap on how much inline text ends up in the job's display summary.
const SUMMARY_LIMIT: usize = 80;

/// Submission response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Id of the created job, or of the reused completed job on a
    /// dedup hit
    pub job_id: String,
    /// Whether an existing completed job was reused
    pub duplicate: bool,
}

/// An upload already written to the staging directory.
struct StagedUpload {
    path: PathBuf,
    filename: String,
    content_type: Option<String>,
    fingerprint: String,
}

/// POST /api/process
///
/// Multipart fields:
/// - `input_kind`: remote-media | document | text (required)
/// - `url`: payload for remote-media
/// - `text`: payload for text
/// - `file`: payload for document
/// - `model`: optional model selector
///
/// Returns 202 with the new job id, or 200 with an existing job id on
/// a dedup hit. Validation failures return 400 before any job exists.
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let mut input_kind: Option<InputKind> = None;
    let mut url: Option<String> = None;
    let mut text: Option<String> = None;
    let mut model: Option<String> = None;
    let mut upload: Option<StagedUpload> = None;

    let read_result: ApiResult<()> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
        {
            match field.name() {
                Some("input_kind") => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?;
                    input_kind =
                        Some(value.trim().parse().map_err(|e| {
                            ApiError::validation(format!("Invalid input_kind: {e}"))
                        })?);
                }
                Some("url") => {
                    url = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| ApiError::bad_request(e.to_string()))?,
                    );
                }
                Some("text") => {
                    text = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| ApiError::bad_request(e.to_string()))?,
                    );
                }
                Some("model") => {
                    model = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| ApiError::bad_request(e.to_string()))?,
                    );
                }
                Some("file") => {
                    let filename = field
                        .file_name()
                        .map(sanitize_filename)
                        .unwrap_or_else(|| "upload".to_string());
                    let content_type = field.content_type().map(str::to_lowercase);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Upload failed: {e}")))?;

                    // Stage to disk immediately; validation happens after.
                    let path = state
                        .config
                        .staging_dir
                        .join(format!("{}_{filename}", Uuid::new_v4()));
                    tokio::fs::write(&path, &bytes)
                        .await
                        .map_err(|e| ApiError::internal(format!("Failed to stage upload: {e}")))?;

                    upload = Some(StagedUpload {
                        path,
                        filename,
                        content_type,
                        fingerprint: fingerprint_bytes(&bytes),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    // Any rejection from here on must release what was already staged.
    let outcome = match read_result {
        Ok(()) => create_job(&state, input_kind, url, text, model, &upload).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(response) => Ok(response),
        Err(e) => {
            if let Some(staged) = &upload {
                let _ = tokio::fs::remove_file(&staged.path).await;
            }
            Err(e)
        }
    }
}

async fn create_job(
    state: &AppState,
    input_kind: Option<InputKind>,
    url: Option<String>,
    text: Option<String>,
    model: Option<String>,
    upload: &Option<StagedUpload>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let kind = input_kind.ok_or_else(|| ApiError::validation("input_kind is required"))?;

    // Resolve (payload, summary, fingerprint) per input kind.
    let (payload, summary, fingerprint) = match kind {
        InputKind::RemoteMedia => {
            let url = url
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| ApiError::validation("url is required for remote-media"))?;
            let fingerprint = fingerprint_str(&url);
            (url.clone(), url, fingerprint)
        }
        InputKind::Text => {
            let text = text
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| ApiError::validation("text is required for text input"))?;
            let fingerprint = fingerprint_str(&text);
            (text.clone(), summarize(&text), fingerprint)
        }
        InputKind::Document => {
            let staged = upload
                .as_ref()
                .ok_or_else(|| ApiError::validation("file is required for document input"))?;
            validate_upload(state, staged)?;
            (
                staged.path.to_string_lossy().into_owned(),
                staged.filename.clone(),
                staged.fingerprint.clone(),
            )
        }
    };

    // Dedup: a completed job with the same content is returned as-is,
    // with no new work performed.
    if let Some(existing) = state.store.find_completed(kind, &fingerprint).await? {
        info!(job_id = %existing, kind = %kind, "Dedup hit, reusing completed job");
        if let Some(staged) = upload {
            let _ = tokio::fs::remove_file(&staged.path).await;
        }
        return Ok((
            StatusCode::OK,
            Json(SubmitResponse {
                job_id: existing.to_string(),
                duplicate: true,
            }),
        ));
    }

    let job = Job::new(kind, summary, Some(fingerprint));
    state.store.create_job(&job).await?;

    let mut staging = JobStaging::new(&state.config.generated_dir, &job.id);
    if let Some(staged) = upload {
        staging = staging.with_upload(staged.path.clone());
    }

    let invocation = WorkerInvocation::new(
        kind.operation(),
        payload,
        job.id.clone(),
        model.unwrap_or_else(|| state.config.default_model.clone()),
    );

    // Fire and forget: the caller polls for status.
    let pipeline = state.pipeline.clone();
    let job_id = job.id.clone();
    tokio::spawn(async move {
        pipeline.run(job_id, invocation, staging).await;
    });

    info!(job_id = %job.id, kind = %kind, "Job submitted");
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: job.id.to_string(),
            duplicate: false,
        }),
    ))
}

fn validate_upload(state: &AppState, staged: &StagedUpload) -> ApiResult<()> {
    let extension = staged
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase());

    let extension_allowed = extension
        .as_deref()
        .is_some_and(|ext| state.config.allowed_upload_extensions.iter().any(|a| a == ext));
    let type_allowed = staged
        .content_type
        .as_deref()
        .is_some_and(|ct| state.config.allowed_upload_types.iter().any(|a| a == ct));

    if extension_allowed || type_allowed {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "Unsupported upload type for '{}'",
            staged.filename
        )))
    }
}

/// Keep only the final path component of a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("upload")
        .to_string()
}

fn summarize(text: &str) -> String {
    let trimmed = text.trim();
    let mut summary: String = trimmed.chars().take(SUMMARY_LIMIT).collect();
    if trimmed.chars().count() > SUMMARY_LIMIT {
        summary.push('…');
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\dir\\doc.pdf"), "doc.pdf");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_summarize_truncates_long_text() {
        assert_eq!(summarize("short"), "short");
        let long = "x".repeat(200);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), SUMMARY_LIMIT + 1);
        assert!(summary.ends_with('…'));
    }
}
