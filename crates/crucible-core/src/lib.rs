//! # crucible-core
//!
//! Shared domain types for the Crucible code execution service:
//! the wire-level request/response envelope, the error taxonomy, outcome
//! classification, and environment-driven configuration.
//!
//! Everything here is plain data; the engine and the HTTP server both depend
//! on this crate and nothing in it depends on them.

pub mod classify;
pub mod config;
pub mod error;
pub mod types;

pub use classify::{classify, Classification};
pub use config::Config;
pub use error::EngineError;
pub use types::{ErrorType, ExecuteResponse, ExecutionRequest, ExecutionResult};
