//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart job submission with fingerprint dedup
//! - Job status polling
//! - On-demand clip extraction for existing posts
//! - The timeout reaper background service

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::TimeoutReaper;
pub use state::AppState;
