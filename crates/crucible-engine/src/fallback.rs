//! Synthetic fallback executor.
//!
//! Used only when no container runtime is reachable at startup and the
//! operator has explicitly opted in. Output is synthesized deterministically
//! from the submitted code by extracting the argument of the language's
//! print idiom, prefixed with a language tag (`"Python output: …"`). Every
//! response additionally carries [`FALLBACK_NOTICE`] as the first stderr
//! line, so a synthetic run can never be mistaken for a real one, print
//! idiom or not.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::instrument;

use crucible_core::{EngineError, ExecutionRequest, ExecutionResult};

use crate::catalog::LanguageSpec;
use crate::executor::ExecutionBackend;

/// Marker carried on stderr by every synthetic response.
pub const FALLBACK_NOTICE: &str =
    "[crucible fallback mode: output is synthesized, no sandbox was run]";

/// Development-only executor producing synthetic output.
#[derive(Debug, Default)]
pub struct FallbackBackend;

impl FallbackBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionBackend for FallbackBackend {
    #[instrument(skip(self, request), fields(language = spec.tag))]
    async fn execute(
        &self,
        spec: &'static LanguageSpec,
        request: &ExecutionRequest,
        _deadline: Duration,
    ) -> Result<ExecutionResult, EngineError> {
        let started = Instant::now();
        let mut result = synthesize(spec.tag, &request.code, request.stdin.as_deref());
        result.stderr = if result.stderr.is_empty() {
            FALLBACK_NOTICE.to_string()
        } else {
            format!("{FALLBACK_NOTICE}\n{}", result.stderr)
        };
        result.elapsed_ms = started.elapsed().as_millis().max(1) as u64;
        Ok(result)
    }
}

fn synthesize(language: &str, code: &str, stdin: Option<&str>) -> ExecutionResult {
    let mut result = ExecutionResult::default();

    match language {
        "python" => {
            if code.contains("print") {
                result.stdout = format!("Python output: {}", extract_print_content(code, language));
                if code.contains("input") {
                    if let Some(stdin) = stdin.filter(|s| !s.is_empty()) {
                        result.stdout.push_str(&format!("\nInput was: {stdin}"));
                    }
                }
            } else if code.contains("error") || code.contains("raise") {
                result.stderr = "Python error: Simulated exception".to_string();
                result.exit_code = 1;
            }
        }
        "javascript" => {
            if code.contains("console.log") {
                result.stdout =
                    format!("JavaScript output: {}", extract_print_content(code, language));
            }
        }
        "cpp" => {
            if code.contains("cout") {
                result.stdout = format!("C++ output: {}", extract_print_content(code, language));
            }
        }
        "java" => {
            if code.contains("System.out.println") {
                result.stdout = format!("Java output: {}", extract_print_content(code, language));
            }
        }
        "go" => {
            if code.contains("fmt.Println") {
                result.stdout = format!("Go output: {}", extract_print_content(code, language));
            }
        }
        _ => {}
    }

    result
}

/// Pull the argument out of the language's print idiom.
fn extract_print_content(code: &str, language: &str) -> String {
    let (print_start, print_end) = match language {
        "python" => ("print(", ")"),
        "javascript" => ("console.log(", ")"),
        "cpp" => ("cout <<", ";"),
        "java" => ("System.out.println(", ")"),
        "go" => ("fmt.Println(", ")"),
        _ => return "[Content could not be extracted]".to_string(),
    };

    if let Some(start) = code.find(print_start) {
        let rest = &code[start + print_start.len()..];
        if let Some(end) = rest.find(print_end) {
            return rest[..end].trim().trim_matches(|c| c == '\'' || c == '"').to_string();
        }
    }
    "[Content could not be extracted]".to_string()
}
