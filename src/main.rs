mod routes;
mod controllers;
mod services;
mod models;
mod api_docs;
mod shared_state;
mod config;
mod errors;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use axum::{Router, routing::get, response::Html};
use tracing::{error, info};
use crate::routes::api_routes::api_routes;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;
use crate::api_docs::ApiDoc;
use crate::shared_state::AppState;
use crate::config::Config;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

#[cfg(feature = "verbose_log")]
const DEFAULT_LOG_LEVEL: tracing::Level = tracing::Level::DEBUG;
#[cfg(not(feature = "verbose_log"))]
const DEFAULT_LOG_LEVEL: tracing::Level = tracing::Level::INFO;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(DEFAULT_LOG_LEVEL.into())
                .from_env_lossy(),
        )
        .init();

    // 1. Load configuration
    let config = match Config::load_from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        port = config.server.port,
        cache_dir = %config.cache.dir,
        backend = ?config.weather.historical_backend,
        "configuration loaded"
    );

    // 2. Build the pipeline services
    let state = match AppState::new(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize services: {}", e);
            std::process::exit(1);
        }
    };

    // 3. Start Axum HTTP server
    let app = Router::new()
        .nest("/api", api_routes(state))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("API Server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    if let Err(e) = axum_server::bind(addr).serve(app.into_make_service()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
