use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{ApiError, SelectGarmentRequest, SessionCreated};
use crate::models::view::ViewSnapshot;
use crate::session::SessionError;

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::UnknownGarment(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
        };
        (
            status,
            Json(ApiError {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.into(),
        }),
    )
        .into_response()
}

/// POST /api/v1/sessions — start on the upload screen.
pub async fn create_session(State(state): State<AppState>) -> Json<SessionCreated> {
    let controller = state.sessions.create().await;
    Json(SessionCreated {
        session_id: controller.id(),
        view: controller.snapshot().await,
    })
}

/// GET /api/v1/sessions/{id} — current view.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewSnapshot>, SessionError> {
    let controller = state.sessions.get(id).await?;
    Ok(Json(controller.snapshot().await))
}

/// POST /api/v1/sessions/{id}/upload — multipart `image` field.
///
/// Responds once the first generation has settled. A file that cannot be
/// read is not an HTTP error: the snapshot stays on the upload screen with
/// the message to show.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ViewSnapshot>, Response> {
    let controller = state
        .sessions
        .get(id)
        .await
        .map_err(IntoResponse::into_response)?;

    let mut upload: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() == Some("image") {
            let declared = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(e.body_text()))?;
            upload = Some((data.to_vec(), declared));
        }
    }

    let (bytes, declared) = upload.ok_or_else(|| bad_request("missing `image` field"))?;

    Ok(Json(controller.upload(&bytes, declared.as_deref()).await))
}

/// POST /api/v1/sessions/{id}/garment — switch color and regenerate.
pub async fn select_garment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectGarmentRequest>,
) -> Result<Json<ViewSnapshot>, Response> {
    request
        .validate()
        .map_err(|e| bad_request(e.to_string()))?;

    let controller = state
        .sessions
        .get(id)
        .await
        .map_err(IntoResponse::into_response)?;

    controller
        .select_garment(&request.label)
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

/// POST /api/v1/sessions/{id}/retry — regenerate with current selections.
pub async fn retry_generation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewSnapshot>, SessionError> {
    let controller = state.sessions.get(id).await?;
    Ok(Json(controller.retry().await?))
}

/// POST /api/v1/sessions/{id}/back — back to the upload screen.
pub async fn go_back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ViewSnapshot>, SessionError> {
    let controller = state.sessions.get(id).await?;
    Ok(Json(controller.back().await))
}
