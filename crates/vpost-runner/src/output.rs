//! Worker output parsing and stderr error-message scraping.
//!
//! On success the worker prints one JSON object to stdout with a
//! `posts` list. On failure it exits non-zero with a JSON object
//! carrying an `error` field as the last line of stderr.
//!
//! The stderr scraping is a compatibility heuristic inherited from the
//! worker contract. It lives behind these free functions so a
//! structured error channel could replace it without touching
//! ingestion.

use serde::Deserialize;

use vpost_models::NewPost;

/// Upper bound on raw output quoted back in error messages.
pub const EXCERPT_LIMIT: usize = 500;

/// Message used when stderr gives us nothing usable.
pub const UNKNOWN_ERROR: &str = "Unknown worker error.";

/// The single JSON object a successful worker prints to stdout.
#[derive(Debug, Deserialize)]
pub struct WorkerOutput {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub posts: Vec<WorkerPost>,
}

/// One post record as emitted by the worker.
///
/// Freshly generated posts carry `source_quote`; reused ones carry
/// `quote_snippet`. Both land in the same column.
#[derive(Debug, Deserialize)]
pub struct WorkerPost {
    #[serde(alias = "content")]
    pub post_text: String,
    #[serde(default, alias = "quote_snippet")]
    pub source_quote: Option<String>,
    #[serde(default)]
    pub media_path: Option<String>,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub page_number: Option<i64>,
}

impl From<WorkerPost> for NewPost {
    fn from(post: WorkerPost) -> Self {
        NewPost {
            content: post.post_text,
            quote_snippet: post.source_quote,
            media_path: post.media_path,
            start_time: post.start_time,
            end_time: post.end_time,
            page_number: post.page_number,
        }
    }
}

/// The object printed by a successful clip-extract invocation.
#[derive(Debug, Deserialize)]
pub struct ClipOutput {
    pub media_path: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub quote_snippet: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Parse the worker's stdout payload into post records.
pub fn parse_worker_output(stdout: &str) -> Result<Vec<NewPost>, serde_json::Error> {
    let output: WorkerOutput = serde_json::from_str(stdout.trim())?;
    Ok(output.posts.into_iter().map(NewPost::from).collect())
}

/// Parse the stdout of a clip-extract invocation.
pub fn parse_clip_output(stdout: &str) -> Result<ClipOutput, serde_json::Error> {
    serde_json::from_str(stdout.trim())
}

/// Build a human-readable failure message from accumulated stderr.
///
/// Takes the last non-empty line; if it parses as a JSON object with a
/// string `error` field, that value is used. An unparseable line is
/// used raw (bounded). With no lines at all, a bounded prefix of the
/// whole stderr is used, or a fixed unknown-error message when stderr
/// is empty. A non-zero exit code is appended as `" (exit code: N)"`.
pub fn build_error_message(stderr: &str, exit_code: Option<i32>) -> String {
    let last_line = stderr.lines().rev().map(str::trim).find(|l| !l.is_empty());

    let mut message = match last_line {
        Some(line) => match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => value
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            Err(_) => bounded(line, EXCERPT_LIMIT).to_string(),
        },
        None => {
            let prefix = bounded(stderr.trim(), EXCERPT_LIMIT);
            if prefix.is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                prefix.to_string()
            }
        }
    };

    if let Some(code) = exit_code {
        if code != 0 {
            message.push_str(&format!(" (exit code: {code})"));
        }
    }

    message
}

/// Truncate to at most `limit` characters, respecting char boundaries.
pub fn bounded(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
