use axum::extract::State;
use axum::Json;
use gotham_core::{LightDevice, Rgb};
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightAction {
    On,
    Off,
    Brightness,
    Color,
    Scene,
}

#[derive(serde::Deserialize)]
pub struct LightBody {
    pub action: LightAction,
    #[serde(default)]
    pub value: Option<Value>,
}

/// POST /api/light: send one manual command straight to the device.
///
/// Goes through the same rate limiter as celebrations. A running celebration
/// is not interrupted and may overwrite the change on its next step.
pub async fn control(
    State(app): State<AppState>,
    Json(body): Json<LightBody>,
) -> Result<Json<Value>, AppError> {
    let device = app.orchestrator.device();
    match body.action {
        LightAction::On => device.set_power(true).await?,
        LightAction::Off => device.set_power(false).await?,
        LightAction::Brightness => {
            let level = body
                .value
                .as_ref()
                .and_then(Value::as_u64)
                .ok_or_else(|| AppError::bad_request("brightness needs a numeric value"))?;
            let level = u8::try_from(level)
                .map_err(|_| AppError::bad_request(format!("brightness {level} out of range")))?;
            device.set_brightness(level).await?;
        }
        LightAction::Color => {
            let color = parse_color(body.value.as_ref())?;
            device.set_color(color).await?;
        }
        LightAction::Scene => {
            let scene = body
                .value
                .as_ref()
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| AppError::bad_request("scene needs a numeric id"))?;
            device.trigger_scene(scene).await?;
        }
    }
    Ok(Json(serde_json::json!({ "status": "success" })))
}

/// Accepts `"#rrggbb"` or `{r, g, b}`.
fn parse_color(value: Option<&Value>) -> Result<Rgb, AppError> {
    match value {
        Some(Value::String(s)) => Ok(s.parse::<Rgb>()?),
        Some(v @ Value::Object(_)) => serde_json::from_value::<Rgb>(v.clone())
            .map_err(|e| AppError::bad_request(format!("invalid color: {e}"))),
        _ => Err(AppError::bad_request("color needs \"#rrggbb\" or {r, g, b}")),
    }
}
