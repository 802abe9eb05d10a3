pub mod error;
pub mod routes;
pub mod state;
pub mod stripe;
pub mod youtube;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use gotham_core::config::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health))
        // Celebrations
        .route("/api/celebrations", post(routes::celebrations::trigger))
        .route(
            "/api/celebrations/current",
            get(routes::celebrations::current),
        )
        .route("/api/celebrations/stop", post(routes::celebrations::stop))
        // Patterns and milestones (preview / detection)
        .route("/api/patterns", get(routes::patterns::preview))
        .route("/api/milestones/check", post(routes::milestones::check))
        // Device
        .route("/api/devices", get(routes::devices::list_devices))
        .route("/api/light", post(routes::light::control))
        // Event sources
        .route("/webhooks/stripe", post(routes::webhooks::stripe_webhook))
        .route("/api/youtube/monitor", get(routes::youtube::monitor))
        .route("/api/youtube/monitor/start", post(routes::youtube::start))
        .route("/api/youtube/monitor/stop", post(routes::youtube::stop))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the celebration server on `0.0.0.0:{config.server.port}`.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(config, listener).await
}

/// Start the celebration server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(config: Config, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app_state = state::AppState::new(&config)?;

    if config.youtube.is_enabled() {
        app_state.youtube.start(None, None).await?;
    }

    let orchestrator = Arc::clone(&app_state.orchestrator);
    let monitor = Arc::clone(&app_state.youtube);
    let triggers = app_state.triggers.clone();
    let app = build_router(app_state);

    tracing::info!("gotham listening on http://localhost:{actual_port}");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    monitor.stop().await;
    triggers.close();
    // Leave the light the way the celebration found it.
    orchestrator.stop().await;
    tracing::info!("gotham stopped");

    result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
