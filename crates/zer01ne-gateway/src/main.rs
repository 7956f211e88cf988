//! ZER01NE 67 Gateway: the HTTP face of the in-memory bridge.
//! One process, one `Bridge`, one lock. JSON in, JSON out.

mod handlers;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zer01ne_core::{Bridge, GatewayConfig};

use handlers::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::load().map_err(|e| {
        tracing::error!(error = %e, "failed to load gateway config");
        e
    })?;
    let addr = config.bind_addr();

    tracing::info!(
        system = %config.system_name,
        version = %config.version,
        genesis = %config.genesis_timestamp,
        core = zer01ne_core::version(),
        "{} active",
        zer01ne_core::EQUATION
    );

    let app = router(AppState::new(config, Bridge::new()));

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(%addr, error = %e, "failed to bind");
        e
    })?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/pool/register", post(handlers::register_pool))
        .route("/family/register", post(handlers::create_family))
        .route("/safety/check", post(handlers::check_safety))
        .route("/alerts", get(handlers::get_alerts))
        .route("/earth/validate", post(handlers::earth_validate))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(log_request))
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = std::time::Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "ctrl-c handler failed");
        return;
    }
    tracing::info!("shutdown requested");
}
