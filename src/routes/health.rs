use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub sessions: usize,
    pub cached_garments: usize,
    pub catalog_size: usize,
}

/// GET /health — liveness plus in-memory counters.
///
/// The generation backend is not called; that would spend quota.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            sessions: state.sessions.len().await,
            cached_garments: state.client.cache().len().await,
            catalog_size: state.catalog.options().len(),
        },
    })
}
