//! Worker process supervision for ViralPost.
//!
//! This crate owns the out-of-process boundary with the content
//! transformation worker:
//! - command construction for the positional-argument contract
//! - spawn/timeout/kill supervision with full output capture
//! - interpretation of the worker's terminal outcome
//! - per-job staging cleanup
//!
//! The worker itself (download, transcription, prompting, clip cutting)
//! is an external collaborator consumed only through its command line
//! and stdout/stderr.

pub mod command;
pub mod error;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod staging;
pub mod supervisor;

pub use command::{WorkerConfig, WorkerInvocation};
pub use error::{RunnerError, RunnerResult};
pub use ingest::ResultIngestor;
pub use output::{build_error_message, parse_clip_output, parse_worker_output, ClipOutput};
pub use pipeline::{JobPipeline, TIMEOUT_MESSAGE};
pub use staging::JobStaging;
pub use supervisor::{WorkerExit, WorkerOutcome, WorkerSupervisor};
