//! Input kinds and the worker operation vocabulary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when an input kind string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputKindError(pub String);

impl fmt::Display for InputKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown input kind '{}' (expected remote-media, document, or text)",
            self.0
        )
    }
}

impl std::error::Error for InputKindError {}

/// What kind of content a submission carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    /// A reference to remote media (video/audio URL)
    RemoteMedia,
    /// An uploaded document file
    Document,
    /// Inline text pasted by the caller
    Text,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::RemoteMedia => "remote-media",
            InputKind::Document => "document",
            InputKind::Text => "text",
        }
    }

    /// The worker operation that processes this kind of input.
    pub fn operation(&self) -> WorkerOperation {
        match self {
            InputKind::RemoteMedia => WorkerOperation::RemoteMedia,
            InputKind::Document => WorkerOperation::Document,
            InputKind::Text => WorkerOperation::Text,
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputKind {
    type Err = InputKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote-media" => Ok(InputKind::RemoteMedia),
            "document" => Ok(InputKind::Document),
            "text" => Ok(InputKind::Text),
            other => Err(InputKindError(other.to_string())),
        }
    }
}

/// Operation passed to the worker as its first positional argument.
///
/// This is the command-line contract with the out-of-process worker:
/// `<operation> <payload> <job_id> <model>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerOperation {
    /// Download, transcribe, and summarize remote media
    RemoteMedia,
    /// Extract text and page images from an uploaded document
    Document,
    /// Process inline text directly
    Text,
    /// Locate a quote in already-processed media and cut a clip
    ClipExtract,
}

impl WorkerOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerOperation::RemoteMedia => "remote-media",
            WorkerOperation::Document => "document",
            WorkerOperation::Text => "text",
            WorkerOperation::ClipExtract => "clip-extract",
        }
    }
}

impl fmt::Display for WorkerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
