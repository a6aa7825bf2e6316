//! Application state.

use std::sync::Arc;

use crucible_engine::{AdmissionGate, Engine};

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub admission: Arc<AdmissionGate>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, admission: Arc<AdmissionGate>) -> Self {
        Self { engine, admission }
    }
}
