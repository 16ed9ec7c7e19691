//! Generated post definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::JobId;

/// Unique identifier for a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    /// Generate a new random post ID.
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

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One generated artifact, owned exclusively by its job.
///
/// Posts are created only by result ingestion. The clip-extraction
/// operation may later attach `media_path` and clip bounds; nothing
/// else mutates a post.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Post {
    /// Unique post ID
    pub id: PostId,

    /// Owning job
    pub job_id: JobId,

    /// Generated text body
    pub content: String,

    /// Excerpt from the source material that inspired this post
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_snippet: Option<String>,

    /// Path to an associated clip or image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_path: Option<String>,

    /// Clip start in seconds; present iff `end_time` is present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,

    /// Clip end in seconds; present iff `start_time` is present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,

    /// Source-document page reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A post record as produced by the worker, before it has an identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NewPost {
    /// Generated text body
    pub content: String,
    /// Excerpt from the source material
    pub quote_snippet: Option<String>,
    /// Path to an associated clip or image
    pub media_path: Option<String>,
    /// Clip start in seconds
    pub start_time: Option<f64>,
    /// Clip end in seconds
    pub end_time: Option<f64>,
    /// Source-document page reference
    pub page_number: Option<i64>,
}

impl NewPost {
    /// Clip bounds as a pair, or `None` unless both ends are set.
    pub fn clip_bounds(&self) -> Option<(f64, f64)> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_bounds_require_both_ends() {
        let mut post = NewPost {
            content: "body".to_string(),
            start_time: Some(1.5),
            ..Default::default()
        };
        assert_eq!(post.clip_bounds(), None);

        post.end_time = Some(9.25);
        assert_eq!(post.clip_bounds(), Some((1.5, 9.25)));
    }
}
