use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;
use crate::youtube::MonitorSnapshot;

#[derive(Debug, Default, serde::Deserialize)]
pub struct StartBody {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

/// GET /api/youtube/monitor
pub async fn monitor(State(app): State<AppState>) -> Json<MonitorSnapshot> {
    Json(app.youtube.snapshot().await)
}

/// POST /api/youtube/monitor/start: (re)start polling, optionally for another
/// channel or interval than the configured one.
pub async fn start(
    State(app): State<AppState>,
    body: Option<Json<StartBody>>,
) -> Result<Json<MonitorSnapshot>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let snapshot = app
        .youtube
        .start(body.channel_id, body.interval_secs)
        .await
        .map_err(|e| AppError::bad_request(format!("{e:#}")))?;
    Ok(Json(snapshot))
}

/// POST /api/youtube/monitor/stop
pub async fn stop(State(app): State<AppState>) -> Json<serde_json::Value> {
    let stopped = app.youtube.stop().await;
    Json(serde_json::json!({ "stopped": stopped }))
}
