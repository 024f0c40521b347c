use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod garments;
pub mod health;
pub mod metrics;
pub mod sessions;

/// Headroom for multipart boundaries and headers on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the storefront router: static page, garment assets and the JSON API.
pub fn router(state: AppState, asset_dir: &str, max_upload_bytes: usize) -> Router {
    Router::new()
        // Static UI (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../../static/index.html")) }))
        .nest_service("/assets", ServeDir::new(asset_dir))
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/api/v1/garments", get(garments::list_garments))
        .route("/api/v1/sessions", post(sessions::create_session))
        .route("/api/v1/sessions/{id}", get(sessions::get_session))
        .route("/api/v1/sessions/{id}/upload", post(sessions::upload_image))
        .route("/api/v1/sessions/{id}/garment", post(sessions::select_garment))
        .route("/api/v1/sessions/{id}/retry", post(sessions::retry_generation))
        .route("/api/v1/sessions/{id}/back", post(sessions::go_back))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
}
