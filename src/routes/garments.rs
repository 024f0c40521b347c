use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::models::garment::GarmentOption;

/// GET /api/v1/garments — the color options, default first.
pub async fn list_garments(State(state): State<AppState>) -> Json<Vec<GarmentOption>> {
    Json(state.catalog.options().to_vec())
}
