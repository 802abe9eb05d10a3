use axum::extract::State;
use axum::Json;
use gotham_core::milestone;
use gotham_core::Stimulus;

use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct CheckBody {
    pub previous: u64,
    pub current: u64,
}

/// POST /api/milestones/check: celebrate if `previous -> current` crosses a milestone.
pub async fn check(
    State(app): State<AppState>,
    Json(body): Json<CheckBody>,
) -> Json<serde_json::Value> {
    let Some(hit) = milestone::detect(body.previous, body.current) else {
        return Json(serde_json::json!({ "milestone": null, "triggered": false }));
    };
    let receipt = app
        .triggers
        .submit(Stimulus::subscriber_milestone(hit.threshold, "api"));
    Json(serde_json::json!({
        "milestone": hit,
        "triggered": true,
        "receipt": receipt,
    }))
}
