//! Shared data models for ViralPost backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their lifecycle status
//! - Generated posts
//! - Input kinds and the worker operation vocabulary
//! - Content fingerprinting for duplicate detection

pub mod fingerprint;
pub mod input;
pub mod job;
pub mod post;

// Re-export common types
pub use fingerprint::{fingerprint_bytes, fingerprint_str};
pub use input::{InputKind, InputKindError, WorkerOperation};
pub use job::{Job, JobId, JobStatus};
pub use post::{NewPost, Post, PostId};
