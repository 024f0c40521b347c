use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::view::ViewSnapshot;

/// Body of POST /api/v1/sessions/{id}/garment.
#[derive(Debug, Deserialize, Validate)]
pub struct SelectGarmentRequest {
    #[garde(length(min = 1, max = 64))]
    pub label: String,
}

/// Response after creating a session.
#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub view: ViewSnapshot,
}

/// Error body for rejected API calls.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}
