use axum::extract::Query;
use axum::Json;
use gotham_core::pattern::{self, Tier};

#[derive(serde::Deserialize)]
pub struct PatternParams {
    pub amount: f64,
}

/// GET /api/patterns?amount=<x>: preview only, nothing is sent to the device.
pub async fn preview(Query(params): Query<PatternParams>) -> Json<serde_json::Value> {
    let tier = Tier::for_amount(params.amount);
    Json(serde_json::json!({
        "amount": params.amount,
        "tier": tier.name(),
        "pattern": pattern::for_amount(params.amount),
    }))
}
