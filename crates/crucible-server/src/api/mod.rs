//! API routes.

pub mod execute;
pub mod health;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};

use crate::middleware::logging::log_requests;
use crate::state::AppState;

/// Create the main API router.
///
/// `/api/execute` accepts only `POST`; axum's method routing answers 405 for
/// anything else on the path.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/execute", post(execute::execute))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .layer(from_fn(log_requests))
        .with_state(state)
}
