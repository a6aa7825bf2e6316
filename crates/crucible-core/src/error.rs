//! Engine error taxonomy.

use thiserror::Error;

use crate::types::ErrorType;

/// Errors produced by the execution engine before or during a sandboxed run.
///
/// Workload failures (non-zero exit, OOM kill, deadline) are not errors; they
/// are classified outcomes carried in [`crate::ExecutionResult`]. This enum
/// covers refusals and meta-failures of the engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The language tag does not resolve in the catalog.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The static screener refused the submission.
    #[error("{0}")]
    Rejected(String),

    /// The per-client rate limit refused the request.
    #[error("rate limit exceeded, please try again later")]
    RateLimited,

    /// The global concurrency cap is saturated.
    #[error("too many concurrent executions, try again later")]
    CapacityExhausted,

    /// The container runtime could not be reached at startup.
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// Container runtime, filesystem or I/O failure. The payload is the
    /// internal detail for logging; `Display` stays sanitized so runtime
    /// identifiers and host paths never reach a client.
    #[error("internal execution error")]
    Internal(String),
}

impl EngineError {
    /// The response classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::UnsupportedLanguage(_) => ErrorType::UnsupportedLanguage,
            Self::Rejected(_) => ErrorType::BadRequest,
            Self::RateLimited | Self::CapacityExhausted => ErrorType::LimitExceeded,
            Self::RuntimeUnavailable(_) | Self::Internal(_) => ErrorType::Internal,
        }
    }
}
