//! Docker-backed sandbox provisioning and supervision.
//!
//! Each admitted request gets a fresh scratch directory bind-mounted at
//! `/code` inside a locked-down container: read-only root filesystem, no
//! network, 256 MiB of memory, one CPU core, at most 50 processes. The
//! supervisor waits on the container under the composed execution deadline,
//! detects OOM kills, demultiplexes the log stream, and tears everything
//! down on every exit path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, LogsOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::stream::StreamExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crucible_core::{Config as ServiceConfig, EngineError, ExecutionRequest, ExecutionResult};

use crate::admission::AdmissionGate;
use crate::catalog::{LanguageSpec, STDIN_FILENAME};
use crate::executor::ExecutionBackend;
use crate::sandbox::Sandbox;

/// Memory cap per sandbox.
const MEMORY_LIMIT_BYTES: i64 = 256 * 1024 * 1024;
/// CPU cap per sandbox, in the runtime's nano-CPU unit (1.0 core).
const NANO_CPUS: i64 = 1_000_000_000;
/// Process cap per sandbox.
const PIDS_LIMIT: i64 = 50;
/// Working directory inside the container; the scratch directory is
/// bind-mounted here.
const WORKDIR: &str = "/code";

/// Container-backed execution.
pub struct DockerBackend {
    docker: Docker,
    admission: Arc<AdmissionGate>,
    image_prefix: String,
    max_output_bytes: usize,
}

impl DockerBackend {
    /// Connect to the local Docker daemon and verify it responds.
    pub async fn connect(
        config: &ServiceConfig,
        admission: Arc<AdmissionGate>,
    ) -> Result<Self, EngineError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::RuntimeUnavailable(format!("could not create client: {e}")))?;
        docker
            .ping()
            .await
            .map_err(|e| EngineError::RuntimeUnavailable(format!("daemon not responding: {e}")))?;
        info!("connected to Docker daemon");
        Ok(Self {
            docker,
            admission,
            image_prefix: config.image_prefix.clone(),
            max_output_bytes: config.max_output_bytes,
        })
    }

    /// Materialize the per-request filesystem and start the container.
    ///
    /// Failure before container creation leaves nothing behind (the scratch
    /// directory and permit release on drop); failure after creation runs
    /// the full teardown sequence.
    async fn provision(
        &self,
        spec: &LanguageSpec,
        request: &ExecutionRequest,
    ) -> Result<Sandbox, EngineError> {
        let permit = self.admission.try_acquire_slot()?;

        let scratch = tempfile::Builder::new()
            .prefix(&format!("crucible-{}-", spec.tag))
            .tempdir()
            .map_err(|e| EngineError::Internal(format!("failed to create scratch dir: {e}")))?;

        tokio::fs::write(scratch.path().join(spec.source_filename), &request.code)
            .await
            .map_err(|e| EngineError::Internal(format!("failed to write source file: {e}")))?;

        let with_stdin = request.stdin.as_deref().is_some_and(|s| !s.is_empty());
        if with_stdin {
            let stdin = request.stdin.as_deref().unwrap_or_default();
            tokio::fs::write(scratch.path().join(STDIN_FILENAME), stdin)
                .await
                .map_err(|e| EngineError::Internal(format!("failed to write stdin file: {e}")))?;
        }

        let host_dir = scratch
            .path()
            .to_str()
            .ok_or_else(|| EngineError::Internal("scratch path is not valid UTF-8".to_string()))?
            .to_string();

        let container_config = Config {
            image: Some(spec.image_name(&self.image_prefix)),
            cmd: Some(spec.command(with_stdin)),
            working_dir: Some(WORKDIR.to_string()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            host_config: Some(HostConfig {
                // Writable: compiled languages place artifacts next to the
                // source. Only this per-request directory is exposed.
                binds: Some(vec![format!("{host_dir}:{WORKDIR}")]),
                network_mode: Some("none".to_string()),
                readonly_rootfs: Some(true),
                memory: Some(MEMORY_LIMIT_BYTES),
                nano_cpus: Some(NANO_CPUS),
                pids_limit: Some(PIDS_LIMIT),
                ..Default::default()
            }),
            ..Default::default()
        };

        let name = format!("crucible-{}", Uuid::new_v4());
        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions { name: name.clone(), platform: None }),
                container_config,
            )
            .await
            .map_err(|e| EngineError::Internal(format!("failed to create container: {e}")))?;

        let sandbox = Sandbox::new(self.docker.clone(), created.id, scratch, permit);

        if let Err(e) = self
            .docker
            .start_container(sandbox.container_id(), None::<StartContainerOptions<String>>)
            .await
        {
            sandbox.teardown().await;
            return Err(EngineError::Internal(format!("failed to start container: {e}")));
        }

        debug!(container = %sandbox.container_id(), language = spec.tag, "sandbox started");
        Ok(sandbox)
    }

    /// Wait out the workload under the deadline, capture its streams and
    /// classify raw facts (exit code, OOM flag, expiry) into the result.
    async fn supervise(
        &self,
        sandbox: Sandbox,
        deadline: Duration,
        started: Instant,
    ) -> Result<ExecutionResult, EngineError> {
        let container_id = sandbox.container_id().to_string();

        let mut wait_stream = self
            .docker
            .wait_container(&container_id, Some(WaitContainerOptions { condition: "not-running" }));

        let mut timed_out = false;
        let mut exit_code: i64 = 0;

        match tokio::time::timeout(deadline, wait_stream.next()).await {
            Err(_) => {
                warn!(container = %container_id, ?deadline, "execution deadline elapsed");
                timed_out = true;
                sandbox.halt().await;
            }
            Ok(Some(Ok(status))) => {
                exit_code = status.status_code;
            }
            Ok(Some(Err(e))) => {
                sandbox.teardown().await;
                return Err(EngineError::Internal(format!("error waiting for container: {e}")));
            }
            Ok(None) => {
                sandbox.teardown().await;
                return Err(EngineError::Internal(
                    "container wait stream ended unexpectedly".to_string(),
                ));
            }
        }

        let oom_killed = self
            .docker
            .inspect_container(&container_id, None::<InspectContainerOptions>)
            .await
            .ok()
            .and_then(|c| c.state)
            .and_then(|s| s.oom_killed)
            .unwrap_or(false);

        let logs = self.collect_logs(&container_id).await;
        sandbox.teardown().await;

        let (stdout, stderr, stdout_truncated, stderr_truncated) = match logs {
            Ok(streams) => streams,
            // A killed container may refuse log collection; the expiry
            // classification stands on its own.
            Err(e) if timed_out => {
                debug!(container = %container_id, error = %e, "log collection after kill failed");
                (String::new(), String::new(), false, false)
            }
            Err(e) => {
                return Err(EngineError::Internal(format!("failed to get container logs: {e}")));
            }
        };

        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code,
            oom_killed,
            timed_out,
            elapsed_ms: started.elapsed().as_millis() as u64,
            stdout_truncated,
            stderr_truncated,
        })
    }

    /// Demultiplex the container's log stream into separate stdout/stderr
    /// buffers, each capped at `max_output_bytes`.
    async fn collect_logs(
        &self,
        container_id: &str,
    ) -> Result<(String, String, bool, bool), bollard::errors::Error> {
        let mut stream = self.docker.logs(
            container_id,
            Some(LogsOptions::<String> { stdout: true, stderr: true, ..Default::default() }),
        );

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut stdout_truncated = false;
        let mut stderr_truncated = false;

        while let Some(chunk) = stream.next().await {
            match chunk? {
                LogOutput::StdOut { message } => {
                    append_capped(&mut stdout, &message, self.max_output_bytes, &mut stdout_truncated);
                }
                LogOutput::StdErr { message } => {
                    append_capped(&mut stderr, &message, self.max_output_bytes, &mut stderr_truncated);
                }
                _ => {}
            }
        }

        Ok((stdout, stderr, stdout_truncated, stderr_truncated))
    }
}

#[async_trait]
impl ExecutionBackend for DockerBackend {
    #[instrument(skip(self, request), fields(language = spec.tag))]
    async fn execute(
        &self,
        spec: &'static LanguageSpec,
        request: &ExecutionRequest,
        deadline: Duration,
    ) -> Result<ExecutionResult, EngineError> {
        let started = Instant::now();
        let sandbox = self.provision(spec, request).await?;
        self.supervise(sandbox, deadline, started).await
    }
}

/// Append a log chunk to a capped buffer, marking truncation once.
fn append_capped(buffer: &mut String, chunk: &[u8], cap: usize, truncated: &mut bool) {
    if *truncated {
        return;
    }
    let text = String::from_utf8_lossy(chunk);
    let remaining = cap.saturating_sub(buffer.len());
    if text.len() <= remaining {
        buffer.push_str(&text);
        return;
    }
    let mut end = remaining;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    buffer.push_str(&text[..end]);
    buffer.push_str("\n[output truncated]");
    *truncated = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_capped_passes_small_chunks_through() {
        let mut buf = String::new();
        let mut truncated = false;
        append_capped(&mut buf, b"hello\n", 1024, &mut truncated);
        append_capped(&mut buf, b"world\n", 1024, &mut truncated);
        assert_eq!(buf, "hello\nworld\n");
        assert!(!truncated);
    }

    #[test]
    fn append_capped_truncates_at_the_limit() {
        let mut buf = String::new();
        let mut truncated = false;
        append_capped(&mut buf, b"abcdefgh", 4, &mut truncated);
        assert!(truncated);
        assert!(buf.starts_with("abcd"));
        assert!(buf.ends_with("[output truncated]"));

        // Further chunks are discarded once truncated.
        let before = buf.clone();
        append_capped(&mut buf, b"more", 4, &mut truncated);
        assert_eq!(buf, before);
    }

    #[test]
    fn append_capped_respects_utf8_boundaries() {
        let mut buf = String::new();
        let mut truncated = false;
        // "é" is two bytes; a 3-byte cap may not split it.
        append_capped(&mut buf, "aéé".as_bytes(), 3, &mut truncated);
        assert!(truncated);
        assert!(buf.starts_with("aé"));
    }
}
