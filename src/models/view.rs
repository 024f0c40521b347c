use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Recovery, TryOnError};
use crate::models::garment::GarmentOption;
use crate::models::image::{GeneratedImage, UploadedImage};

/// Top-level screen of a try-on session.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// No photo yet. `error` holds the last failed read, if any.
    Upload { error: Option<TryOnError> },
    Product {
        image: UploadedImage,
        garment: GarmentOption,
        phase: Phase,
        /// A replacement photo that could not be read. The current photo stays.
        upload_error: Option<TryOnError>,
    },
}

/// Progress of the generation on the product screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// A call tagged `seq` is in flight; only its result is accepted.
    Generating { seq: u64 },
    Ready { result: GeneratedImage },
    Failed { error: TryOnError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Upload,
    Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Generating,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub kind: &'static str,
    pub message: String,
    pub recovery: Recovery,
}

impl From<&TryOnError> for ErrorView {
    fn from(error: &TryOnError) -> Self {
        Self {
            kind: error.kind(),
            message: error.user_message(),
            recovery: error.recovery(),
        }
    }
}

/// What the page renders for a session.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub session_id: Uuid,
    pub screen: Screen,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<PhaseKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_error: Option<ErrorView>,
    pub updated_at: DateTime<Utc>,
}

impl ViewSnapshot {
    pub fn from_state(session_id: Uuid, state: &ViewState) -> Self {
        let mut snapshot = Self {
            session_id,
            screen: Screen::Upload,
            phase: None,
            garment: None,
            uploaded_image: None,
            generated_image: None,
            error: None,
            upload_error: None,
            updated_at: Utc::now(),
        };

        match state {
            ViewState::Upload { error } => {
                snapshot.error = error.as_ref().map(ErrorView::from);
            }
            ViewState::Product {
                image,
                garment,
                phase,
                upload_error,
            } => {
                snapshot.screen = Screen::Product;
                snapshot.upload_error = upload_error.as_ref().map(ErrorView::from);
                snapshot.garment = Some(garment.label.clone());
                snapshot.uploaded_image = Some(image.data_url());
                match phase {
                    Phase::Generating { .. } => snapshot.phase = Some(PhaseKind::Generating),
                    Phase::Ready { result } => {
                        snapshot.phase = Some(PhaseKind::Ready);
                        snapshot.generated_image = Some(result.data_url());
                    }
                    Phase::Failed { error } => {
                        snapshot.phase = Some(PhaseKind::Failed);
                        snapshot.error = Some(ErrorView::from(error));
                    }
                }
            }
        }

        snapshot
    }
}
