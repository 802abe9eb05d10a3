use axum::extract::State;
use axum::Json;
use gotham_core::{Status, StimulusKind, StopReport, Stimulus, TriggerReceipt};

use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct TriggerBody {
    pub kind: StimulusKind,
    pub magnitude: f64,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "api".to_string()
}

/// POST /api/celebrations: queue a celebration that supersedes any running one.
///
/// Returns as soon as the trigger is queued; the session id in the receipt
/// shows up in `/api/celebrations/current` once the previous run has restored.
pub async fn trigger(
    State(app): State<AppState>,
    Json(body): Json<TriggerBody>,
) -> Json<TriggerReceipt> {
    let stimulus = Stimulus::new(body.kind, body.magnitude, body.source);
    Json(app.triggers.submit(stimulus))
}

/// GET /api/celebrations/current
pub async fn current(State(app): State<AppState>) -> Json<Status> {
    Json(app.orchestrator.status())
}

/// POST /api/celebrations/stop: idempotent; `stopped` is false when idle.
pub async fn stop(State(app): State<AppState>) -> Json<StopReport> {
    Json(app.orchestrator.stop().await)
}
