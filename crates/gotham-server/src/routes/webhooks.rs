use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use gotham_core::Stimulus;
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;
use crate::stripe::{self, StripeEvent};

/// POST /webhooks/stripe
///
/// Verifies the signature over the raw body, then acknowledges immediately.
/// Payment events are queued behind any earlier ones, in arrival order.
pub async fn stripe_webhook(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(secret) = app.stripe_secret.as_deref() else {
        return Err(AppError::unavailable("stripe webhook secret is not configured"));
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());
    stripe::verify_signature(&body, signature, secret, chrono::Utc::now().timestamp()).map_err(
        |e| {
            warn!(error = %e, "stripe webhook rejected");
            AppError::bad_request(e.to_string())
        },
    )?;

    let event = StripeEvent::parse(&body).map_err(|e| AppError::bad_request(e.to_string()))?;

    match event.payment_amount() {
        Some(amount) => {
            info!(event = %event.id, kind = %event.kind, amount, "stripe payment received");
            let receipt = app.triggers.submit(Stimulus::payment(amount, "stripe"));
            info!(
                session = %receipt.session_id,
                pattern = %receipt.pattern_name,
                "celebration queued"
            );
        }
        None => info!(event = %event.id, kind = %event.kind, "stripe event ignored"),
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "event_type": event.kind,
    })))
}
