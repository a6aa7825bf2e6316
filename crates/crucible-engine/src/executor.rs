//! The execution seam and the request pipeline.
//!
//! [`ExecutionBackend`] is the single boundary between "decide whether and
//! how to run" and "actually run": the container-backed implementation and
//! the synthetic fallback both live behind it, and the choice between them
//! is made once at startup, never per request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crucible_core::config::clamp_timeout;
use crucible_core::{classify, Config, EngineError, ExecuteResponse, ExecutionRequest, ExecutionResult};

use crate::admission::AdmissionGate;
use crate::catalog::{self, LanguageSpec};
use crate::screen;

/// An execution backend runs one validated, admitted request to completion
/// and reports the raw outcome.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(
        &self,
        spec: &'static LanguageSpec,
        request: &ExecutionRequest,
        deadline: Duration,
    ) -> Result<ExecutionResult, EngineError>;
}

/// The engine drives the per-request pipeline: catalog lookup, static
/// screening, admission, execution, classification.
pub struct Engine {
    backend: Arc<dyn ExecutionBackend>,
    admission: Arc<AdmissionGate>,
    max_code_len: usize,
    default_timeout: u64,
}

impl Engine {
    pub fn new(
        config: &Config,
        admission: Arc<AdmissionGate>,
        backend: Arc<dyn ExecutionBackend>,
    ) -> Self {
        Self {
            backend,
            admission,
            max_code_len: config.max_code_len,
            default_timeout: config.default_timeout,
        }
    }

    /// Run one submission for the given client identity.
    ///
    /// Refusals (unknown language, screening, limits) return an error before
    /// any sandbox exists; otherwise the backend's raw result is classified
    /// into the response envelope.
    pub async fn execute(
        &self,
        client: &str,
        request: &ExecutionRequest,
    ) -> Result<ExecuteResponse, EngineError> {
        let spec = catalog::lookup(&request.language).ok_or_else(|| {
            let supported: Vec<&str> = catalog::supported_tags().collect();
            EngineError::UnsupportedLanguage(format!(
                "{} (supported: {})",
                request.language,
                supported.join(", ")
            ))
        })?;

        screen::screen(spec.tag, &request.code, self.max_code_len)?;

        self.admission.check_rate(client)?;

        let deadline = clamp_timeout(request.timeout, self.default_timeout);
        debug!(language = spec.tag, ?deadline, client, "request admitted");

        let result = self.backend.execute(spec, request, deadline).await?;
        let classification = classify(&result, spec.compiled, deadline.as_secs());

        Ok(ExecuteResponse {
            stdout: result.stdout,
            stderr: result.stderr,
            error: classification.message,
            error_type: classification.error_type,
            execution_time_ms: result.elapsed_ms,
        })
    }
}
