//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::clip::extract_clip;
use crate::handlers::health::health;
use crate::handlers::status::get_job_status;
use crate::handlers::submit::submit_job;
use crate::middleware::{cors_layer, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/process", post(submit_job))
        .route("/status", get(get_job_status))
        .route("/clip", post(extract_clip));

    let health_routes = Router::new().route("/health", get(health));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
