//! Per-request sandbox resource.
//!
//! A [`Sandbox`] owns exactly three things: the container, the scratch
//! directory bind-mounted into it, and the global execution slot. Ownership
//! is exclusive to one supervision flow; on every exit path all three are
//! released, in that order. The semaphore permit is dropped only after the
//! container is removed so the in-flight count never under-counts live
//! sandboxes.

use bollard::container::{KillContainerOptions, RemoveContainerOptions, StopContainerOptions};
use bollard::Docker;
use tempfile::TempDir;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, warn};

/// Grace given to a container to stop before it is killed, in seconds.
const STOP_GRACE_SECS: i64 = 1;

/// A provisioned sandbox: container, scratch directory, execution slot.
pub struct Sandbox {
    docker: Docker,
    container_id: String,
    scratch: Option<TempDir>,
    permit: Option<OwnedSemaphorePermit>,
    defused: bool,
}

impl Sandbox {
    pub fn new(
        docker: Docker,
        container_id: String,
        scratch: TempDir,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            docker,
            container_id,
            scratch: Some(scratch),
            permit: Some(permit),
            defused: false,
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Force-stop the workload: brief grace, then SIGKILL. The container is
    /// left in place for log collection; removal happens in [`teardown`].
    ///
    /// [`teardown`]: Sandbox::teardown
    pub async fn halt(&self) {
        halt_container(&self.docker, &self.container_id).await;
    }

    /// Release everything this sandbox owns: container removal, scratch
    /// directory removal, then the semaphore permit.
    pub async fn teardown(mut self) {
        self.defused = true;
        remove_container(&self.docker, &self.container_id).await;
        if let Some(scratch) = self.scratch.take() {
            if let Err(e) = scratch.close() {
                warn!(error = %e, "failed to remove scratch directory");
            }
        }
        drop(self.permit.take());
    }
}

/// Abandoned-future path: the supervising flow was dropped (client
/// disconnect, panic) before the explicit teardown ran. The same release
/// sequence is spawned onto the runtime; the permit moves into the task so
/// its release still follows container removal.
impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.defused {
            return;
        }
        let docker = self.docker.clone();
        let container_id = std::mem::take(&mut self.container_id);
        let scratch = self.scratch.take();
        let permit = self.permit.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(container = %container_id, "supervision abandoned, spawning teardown");
                handle.spawn(async move {
                    halt_container(&docker, &container_id).await;
                    remove_container(&docker, &container_id).await;
                    drop(scratch);
                    drop(permit);
                });
            }
            Err(_) => {
                // No runtime left (process shutdown); the daemon will hold
                // the container until the next startup sweep, but the
                // scratch directory still goes.
                warn!(container = %container_id, "no runtime available for sandbox teardown");
                drop(scratch);
                drop(permit);
            }
        }
    }
}

async fn halt_container(docker: &Docker, container_id: &str) {
    let stop = docker
        .stop_container(container_id, Some(StopContainerOptions { t: STOP_GRACE_SECS }))
        .await;
    if let Err(e) = stop {
        debug!(container = %container_id, error = %e, "stop failed, killing");
        if let Err(e) = docker
            .kill_container(container_id, Some(KillContainerOptions { signal: "SIGKILL" }))
            .await
        {
            debug!(container = %container_id, error = %e, "kill failed");
        }
    }
}

async fn remove_container(docker: &Docker, container_id: &str) {
    let removed = docker
        .remove_container(
            container_id,
            Some(RemoveContainerOptions { force: true, ..Default::default() }),
        )
        .await;
    if let Err(e) = removed {
        warn!(container = %container_id, error = %e, "failed to remove container");
    }
}
