//! Admission gate: per-client rate limiting and the global concurrency cap.
//!
//! Both checks must pass before a sandbox is provisioned. The rate limit is
//! checked first because it is cheap; the semaphore is acquired last because
//! a permit is a scarce resource that travels with the sandbox until
//! teardown.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;

use crucible_core::EngineError;

type ClientLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Combined admission state, shared process-wide.
pub struct AdmissionGate {
    clients: ClientLimiter,
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    pub fn new(per_minute: u32, burst: u32, concurrent_limit: usize) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);
        Self {
            clients: RateLimiter::keyed(quota),
            slots: Arc::new(Semaphore::new(concurrent_limit)),
            capacity: concurrent_limit,
        }
    }

    /// Per-client token-bucket check. Bucket state is created lazily on the
    /// first request from a client.
    pub fn check_rate(&self, client: &str) -> Result<(), EngineError> {
        self.clients
            .check_key(&client.to_string())
            .map_err(|_| EngineError::RateLimited)
    }

    /// Non-blocking acquisition of a global execution slot. The permit is
    /// dropped by the supervisor only after its sandbox is gone, so the
    /// in-flight count never under-counts active sandboxes.
    pub fn try_acquire_slot(&self) -> Result<OwnedSemaphorePermit, EngineError> {
        self.slots
            .clone()
            .try_acquire_owned()
            .map_err(|_| EngineError::CapacityExhausted)
    }

    /// Number of sandboxes currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop per-client state that has fully recovered its burst, i.e. has
    /// been idle long enough to be indistinguishable from a fresh bucket.
    pub fn sweep(&self) {
        self.clients.retain_recent();
        debug!(clients = self.clients.len(), "swept idle rate-limit buckets");
    }

    /// Background task reclaiming idle client buckets on an interval.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}
