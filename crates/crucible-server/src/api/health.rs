//! Health and metrics endpoints.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /metrics
///
/// Prometheus text format: in-flight sandbox count against capacity.
pub async fn metrics(State(state): State<AppState>) -> String {
    format!(
        r#"# HELP crucible_sandboxes_in_flight Number of sandboxes currently executing
# TYPE crucible_sandboxes_in_flight gauge
crucible_sandboxes_in_flight {}

# HELP crucible_sandboxes_capacity Global sandbox capacity
# TYPE crucible_sandboxes_capacity gauge
crucible_sandboxes_capacity {}
"#,
        state.admission.in_flight(),
        state.admission.capacity()
    )
}
