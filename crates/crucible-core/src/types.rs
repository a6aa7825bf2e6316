//! Request, response and execution-result types.

use serde::{Deserialize, Serialize};

/// A single code submission, decoded from the request body.
///
/// Unknown fields are rejected so that client typos (`"lang"`, `"input"`)
/// fail loudly instead of being silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionRequest {
    /// Language tag; must resolve in the catalog.
    pub language: String,
    /// Full source text, UTF-8.
    pub code: String,
    /// Optional standard input, delivered to the workload via file
    /// redirection inside the sandbox.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    /// Requested execution time limit in seconds; clamped by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Raw outcome of one sandboxed run, produced by the supervisor before
/// classification.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
    /// The runtime killed the workload for exceeding its memory cap.
    pub oom_killed: bool,
    /// The execution deadline elapsed before the workload exited.
    pub timed_out: bool,
    pub elapsed_ms: u64,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

/// Classified error category carried in the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    CompileError,
    RuntimeError,
    Timeout,
    MemoryLimit,
    LimitExceeded,
    UnsupportedLanguage,
    BadRequest,
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompileError => "compile_error",
            Self::RuntimeError => "runtime_error",
            Self::Timeout => "timeout",
            Self::MemoryLimit => "memory_limit",
            Self::LimitExceeded => "limit_exceeded",
            Self::UnsupportedLanguage => "unsupported_language",
            Self::BadRequest => "bad_request",
            Self::Internal => "internal",
        }
    }
}

/// The response envelope returned for every `/api/execute` request,
/// successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    pub execution_time_ms: u64,
}

impl ExecuteResponse {
    /// Envelope for requests refused before a sandbox was provisioned.
    pub fn refusal(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            error: Some(message.into()),
            error_type: Some(error_type),
            execution_time_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_unknown_fields() {
        let err = serde_json::from_str::<ExecutionRequest>(
            r#"{"language":"python","code":"print(1)","lang":"python"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn request_requires_code_and_language() {
        assert!(serde_json::from_str::<ExecutionRequest>(r#"{"language":"python"}"#).is_err());
        assert!(serde_json::from_str::<ExecutionRequest>(r#"{"code":"print(1)"}"#).is_err());
    }

    #[test]
    fn error_type_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorType::CompileError).unwrap();
        assert_eq!(json, "\"compile_error\"");
        let json = serde_json::to_string(&ErrorType::UnsupportedLanguage).unwrap();
        assert_eq!(json, "\"unsupported_language\"");
    }

    #[test]
    fn response_omits_absent_error_fields() {
        let resp = ExecuteResponse {
            stdout: "hi\n".to_string(),
            stderr: String::new(),
            error: None,
            error_type: None,
            execution_time_ms: 12,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("error"));
        assert!(json.contains("execution_time_ms"));
    }
}
