use std::time::Duration;

use axum::http::StatusCode;
use gotham_core::config::Config;
use gotham_server::state::AppState;
use http_body_util::BodyExt;
use mockito::Matcher;
use tower::ServiceExt;

const CONTROL_PATH: &str = "/router/api/v1/device/control";
const STATE_PATH: &str = "/router/api/v1/device/state";
const DEVICES_PATH: &str = "/router/api/v1/user/devices";
const SECRET: &str = "whsec_integration";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(govee_url: &str) -> Config {
    let mut config = Config::default();
    config.govee.api_key = "test-key".into();
    config.govee.device = "AA:BB:CC".into();
    config.govee.sku = "H70B1".into();
    config.govee.base_url = govee_url.into();
    config
}

/// A Govee double that accepts every command and reports the light as on.
async fn govee_ok(server: &mut mockito::Server) -> (mockito::Mock, mockito::Mock) {
    let state = server
        .mock("POST", STATE_PATH)
        .with_status(200)
        .with_body(
            r#"{"code":200,"msg":"success","payload":{"capabilities":[
                {"type":"devices.capabilities.on_off","instance":"powerSwitch","state":{"value":1}},
                {"type":"devices.capabilities.range","instance":"brightness","state":{"value":40}}
            ]}}"#,
        )
        .create_async()
        .await;
    let control = server
        .mock("POST", CONTROL_PATH)
        .with_status(200)
        .with_body(r#"{"code":200,"msg":"success"}"#)
        .create_async()
        .await;
    (state, control)
}

fn app(state: AppState) -> axum::Router {
    gotham_server::build_router(state)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, req).await
}

/// POST a raw Stripe payload with an optional signature header.
async fn post_stripe(
    app: axum::Router,
    payload: &[u8],
    signature: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = axum::http::Request::builder()
        .method("POST")
        .uri("/webhooks/stripe")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("stripe-signature", sig);
    }
    let req = builder
        .body(axum::body::Body::from(payload.to_vec()))
        .unwrap();
    send(app, req).await
}

async fn send(
    app: axum::Router,
    req: axum::http::Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Wait until the queued session with this id is the active one.
async fn wait_active(state: &AppState, session_id: &serde_json::Value) {
    let mut board = state.orchestrator.subscribe();
    let id = session_id.as_str().unwrap().to_string();
    tokio::time::timeout(
        Duration::from_secs(5),
        board.wait_for(|b| b.active.as_ref().is_some_and(|a| a.id.to_string() == id)),
    )
    .await
    .expect("queued celebration should start")
    .unwrap();
}

fn payment_event(amount_cents: i64) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": "evt_test",
        "type": "payment_intent.succeeded",
        "data": { "object": { "amount": amount_cents } }
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Health / status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_healthy() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(&config(&server.url())).unwrap();
    let (status, body) = get(app(state), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "gotham");
}

#[tokio::test]
async fn idle_status_and_stop() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(&config(&server.url())).unwrap();

    let (status, body) = get(app(state.clone()), "/api/celebrations/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);
    assert!(body.get("session_id").is_none());

    for _ in 0..2 {
        let (status, body) = post_json(
            app(state.clone()),
            "/api/celebrations/stop",
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stopped"], false);
    }
}

// ---------------------------------------------------------------------------
// Celebrations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_then_status_then_stop() {
    let mut server = mockito::Server::new_async().await;
    let _govee = govee_ok(&mut server).await;
    let state = AppState::new(&config(&server.url())).unwrap();

    let (status, receipt) = post_json(
        app(state.clone()),
        "/api/celebrations",
        serde_json::json!({"kind": "payment", "magnitude": 25.0, "source": "test"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["accepted"], true);
    assert_eq!(receipt["pattern_name"], "Standard");
    assert_eq!(receipt["duration"], 15.0);

    wait_active(&state, &receipt["session_id"]).await;
    let (_, current) = get(app(state.clone()), "/api/celebrations/current").await;
    assert_eq!(current["active"], true);
    assert_eq!(current["session_id"], receipt["session_id"]);
    assert_eq!(current["pattern_name"], "Standard");
    assert_eq!(current["stimulus"]["source"], "test");

    let (_, stopped) = post_json(
        app(state.clone()),
        "/api/celebrations/stop",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(stopped["stopped"], true);

    let (_, current) = get(app(state), "/api/celebrations/current").await;
    assert_eq!(current["active"], false);
    assert_eq!(current["last_run"]["outcome"], "cancelled");
}

#[tokio::test]
async fn back_to_back_triggers_keep_the_later_one() {
    let mut server = mockito::Server::new_async().await;
    let _govee = govee_ok(&mut server).await;
    let state = AppState::new(&config(&server.url())).unwrap();

    let (_, first) = post_json(
        app(state.clone()),
        "/api/celebrations",
        serde_json::json!({"kind": "payment", "magnitude": 150.0}),
    )
    .await;
    let (_, second) = post_json(
        app(state.clone()),
        "/api/celebrations",
        serde_json::json!({"kind": "payment", "magnitude": 5.0}),
    )
    .await;
    assert_ne!(first["session_id"], second["session_id"]);
    assert_eq!(second["pattern_name"], "Mini");

    wait_active(&state, &second["session_id"]).await;
    let (_, current) = get(app(state.clone()), "/api/celebrations/current").await;
    assert_eq!(current["pattern_name"], "Mini");
    assert_eq!(current["stimulus"]["source"], "api");

    state.orchestrator.stop().await;
}

#[tokio::test]
async fn unknown_stimulus_kind_is_rejected() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(&config(&server.url())).unwrap();
    let (status, _) = post_json(
        app(state),
        "/api/celebrations",
        serde_json::json!({"kind": "tweet", "magnitude": 1.0}),
    )
    .await;
    assert!(status.is_client_error());
}

// ---------------------------------------------------------------------------
// Patterns / milestones
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pattern_preview_selects_tier() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(&config(&server.url())).unwrap();

    let (status, body) = get(app(state.clone()), "/api/patterns?amount=150").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "Premium");
    assert_eq!(body["pattern"]["name"], "Premium");
    assert!(!body["pattern"]["steps"].as_array().unwrap().is_empty());

    let (status, _) = get(app(state), "/api/patterns").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn milestone_check_triggers_only_on_crossing() {
    let mut server = mockito::Server::new_async().await;
    let _govee = govee_ok(&mut server).await;
    let state = AppState::new(&config(&server.url())).unwrap();

    let (_, body) = post_json(
        app(state.clone()),
        "/api/milestones/check",
        serde_json::json!({"previous": 100, "current": 100}),
    )
    .await;
    assert_eq!(body["triggered"], false);
    assert!(!state.orchestrator.status().active);

    let (_, body) = post_json(
        app(state.clone()),
        "/api/milestones/check",
        serde_json::json!({"previous": 950, "current": 1001}),
    )
    .await;
    assert_eq!(body["triggered"], true);
    assert_eq!(body["milestone"]["threshold"], 1000);
    assert_eq!(body["receipt"]["pattern_name"], "Standard");
    wait_active(&state, &body["receipt"]["session_id"]).await;

    state.orchestrator.stop().await;
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

#[tokio::test]
async fn devices_are_listed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", DEVICES_PATH)
        .with_status(200)
        .with_body(
            r#"{"code":200,"message":"success","data":[
                {"sku":"H70B1","device":"AA:BB:CC","deviceName":"Desk strip"}
            ]}"#,
        )
        .create_async()
        .await;
    let state = AppState::new(&config(&server.url())).unwrap();

    let (status, body) = get(app(state), "/api/devices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["devices"][0]["deviceName"], "Desk strip");
}

#[tokio::test]
async fn light_color_is_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", CONTROL_PATH)
        .match_body(Matcher::PartialJson(serde_json::json!({
            "payload": {"capability": {"instance": "colorRgb", "value": 0xFF0000}}
        })))
        .with_status(200)
        .with_body(r#"{"code":200,"msg":"success"}"#)
        .create_async()
        .await;
    let state = AppState::new(&config(&server.url())).unwrap();

    let (status, body) = post_json(
        app(state),
        "/api/light",
        serde_json::json!({"action": "color", "value": "#ff0000"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    mock.assert_async().await;
}

#[tokio::test]
async fn out_of_range_brightness_never_reaches_the_vendor() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", CONTROL_PATH)
        .expect(0)
        .create_async()
        .await;
    let state = AppState::new(&config(&server.url())).unwrap();

    for value in [101, 300] {
        let (status, body) = post_json(
            app(state.clone()),
            "/api/light",
            serde_json::json!({"action": "brightness", "value": value}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("brightness"));
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn vendor_rejection_is_a_bad_gateway() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", CONTROL_PATH)
        .with_status(200)
        .with_body(r#"{"code":400,"msg":"device offline"}"#)
        .create_async()
        .await;
    let state = AppState::new(&config(&server.url())).unwrap();

    let (status, body) = post_json(app(state), "/api/light", serde_json::json!({"action": "on"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("device offline"));
}

// ---------------------------------------------------------------------------
// Stripe webhook
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stripe_without_secret_is_unavailable() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(&config(&server.url())).unwrap();
    let (status, _) = post_stripe(app(state), &payment_event(2500), Some("t=1,v1=00")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn stripe_bad_signature_is_rejected() {
    let server = mockito::Server::new_async().await;
    let mut cfg = config(&server.url());
    cfg.stripe.webhook_secret = Some(SECRET.into());
    let state = AppState::new(&cfg).unwrap();

    let payload = payment_event(2500);
    let now = chrono::Utc::now().timestamp();
    let forged = gotham_server::stripe::signature_header(&payload, "whsec_wrong", now).unwrap();

    let (status, _) = post_stripe(app(state.clone()), &payload, Some(&forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post_stripe(app(state.clone()), &payload, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!state.orchestrator.status().active);
}

#[tokio::test]
async fn stripe_payment_starts_a_celebration() {
    let mut server = mockito::Server::new_async().await;
    let _govee = govee_ok(&mut server).await;
    let mut cfg = config(&server.url());
    cfg.stripe.webhook_secret = Some(SECRET.into());
    let state = AppState::new(&cfg).unwrap();

    let payload = payment_event(12_000);
    let now = chrono::Utc::now().timestamp();
    let header = gotham_server::stripe::signature_header(&payload, SECRET, now).unwrap();

    let (status, body) = post_stripe(app(state.clone()), &payload, Some(&header)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["event_type"], "payment_intent.succeeded");

    // The trigger runs on a background task.
    let mut board = state.orchestrator.subscribe();
    tokio::time::timeout(Duration::from_secs(5), board.wait_for(|b| b.active.is_some()))
        .await
        .expect("celebration should start")
        .unwrap();
    let status = state.orchestrator.status();
    assert_eq!(status.pattern_name.as_deref(), Some("Premium"));
    assert_eq!(status.stimulus.unwrap().magnitude, 120.0);

    state.orchestrator.stop().await;
}

#[tokio::test]
async fn stripe_non_payment_event_is_acknowledged() {
    let server = mockito::Server::new_async().await;
    let mut cfg = config(&server.url());
    cfg.stripe.webhook_secret = Some(SECRET.into());
    let state = AppState::new(&cfg).unwrap();

    let payload = serde_json::to_vec(&serde_json::json!({
        "id": "evt_2",
        "type": "customer.created",
        "data": {"object": {}}
    }))
    .unwrap();
    let now = chrono::Utc::now().timestamp();
    let header = gotham_server::stripe::signature_header(&payload, SECRET, now).unwrap();

    let (status, body) = post_stripe(app(state.clone()), &payload, Some(&header)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event_type"], "customer.created");
    tokio::task::yield_now().await;
    assert!(!state.orchestrator.status().active);
}

// ---------------------------------------------------------------------------
// YouTube
// ---------------------------------------------------------------------------

#[tokio::test]
async fn youtube_monitor_reports_disabled_without_credentials() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(&config(&server.url())).unwrap();
    let (status, body) = get(app(state), "/api/youtube/monitor").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert!(body.get("subscriber_count").is_none());
}

#[tokio::test]
async fn youtube_monitor_starts_and_stops_at_runtime() {
    let server = mockito::Server::new_async().await;
    let state = AppState::new(&config(&server.url())).unwrap();

    // No API key configured.
    let (status, body) = post_json(
        app(state.clone()),
        "/api/youtube/monitor/start",
        serde_json::json!({"channel_id": "UC9"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("api_key"));

    let mut yt = mockito::Server::new_async().await;
    let _count = yt
        .mock("GET", "/youtube/v3/channels")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"items":[{"statistics":{"subscriberCount":"77"}}]}"#)
        .create_async()
        .await;
    let mut cfg = config(&server.url());
    cfg.youtube.api_key = Some("yt-key".into());
    cfg.youtube.base_url = yt.url();
    let state = AppState::new(&cfg).unwrap();

    let (status, body) = post_json(
        app(state.clone()),
        "/api/youtube/monitor/start",
        serde_json::json!({"channel_id": "UC9", "interval_secs": 600}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert_eq!(body["channel_id"], "UC9");

    let (status, body) = post_json(
        app(state.clone()),
        "/api/youtube/monitor/stop",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], true);

    let (_, body) = get(app(state.clone()), "/api/youtube/monitor").await;
    assert_eq!(body["enabled"], false);

    let (_, body) = post_json(app(state), "/api/youtube/monitor/stop", serde_json::json!({})).await;
    assert_eq!(body["stopped"], false);
}
