//! Outcome classification.
//!
//! Translates a raw [`ExecutionResult`] into the error category and message
//! carried by the response envelope. Compile and runtime failures are
//! successful executions from the service's point of view; only the category
//! distinguishes them for the client.

use crate::types::{ErrorType, ExecutionResult};

/// Classified view of an execution outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub error_type: Option<ErrorType>,
    pub message: Option<String>,
}

impl Classification {
    fn clean() -> Self {
        Self { error_type: None, message: None }
    }

    fn of(error_type: ErrorType, message: String) -> Self {
        Self { error_type: Some(error_type), message: Some(message) }
    }
}

/// Classify a completed run.
///
/// Precedence: deadline expiry, then OOM kill, then exit status. For
/// compiled languages a non-zero exit whose stderr carries compiler
/// diagnostics is a compile error; the in-image entrypoint exits non-zero on
/// compile failure, so stderr content is the only signal separating the two.
pub fn classify(result: &ExecutionResult, compiled: bool, deadline_secs: u64) -> Classification {
    if result.timed_out {
        return Classification::of(
            ErrorType::Timeout,
            format!("execution timed out after {deadline_secs}s"),
        );
    }

    if result.oom_killed {
        return Classification::of(
            ErrorType::MemoryLimit,
            "execution exceeded memory limit".to_string(),
        );
    }

    if result.exit_code != 0 {
        let code = result.exit_code;
        return if compiled {
            if result.stderr.contains("error") || result.stderr.contains("Error") {
                Classification::of(
                    ErrorType::CompileError,
                    format!("Compilation error (exit code {code})"),
                )
            } else {
                Classification::of(ErrorType::RuntimeError, format!("Runtime error (exit code {code})"))
            }
        } else {
            Classification::of(
                ErrorType::RuntimeError,
                format!("Process exited with code {code}"),
            )
        };
    }

    Classification::clean()
}
