//! Crucible server - HTTP front controller for sandboxed code execution.
//!
//! This crate provides:
//! - The `/api/execute` endpoint and its request validation
//! - Health and metrics endpoints
//! - Request logging middleware
//! - Application state wiring

pub mod api;
pub mod middleware;
pub mod state;

pub use api::create_router;
pub use state::AppState;
