use serde::Serialize;
use strum::{AsRefStr, Display, IntoStaticStr};

/// Message shown when an uploaded file cannot be read at all.
pub const FILE_LOAD_FAILED: &str = "Failed to load image. Please try another file.";

/// Message shown when an uploaded file is not one of the accepted image types.
pub const INVALID_IMAGE_FILE: &str = "Please upload a valid image file.";

/// What the page offers the shopper after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Recovery {
    /// Pick another photo.
    Reupload,
    /// Run the same generation again.
    Retry,
    /// Nothing the shopper can fix; the page still offers going back.
    ContactSupport,
}

/// Every failure a try-on interaction can end in.
///
/// Variants carry plain strings rather than source errors so a failure can be
/// stored in the view state and rendered more than once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TryOnError {
    #[error("Failed to read image file: {0}")]
    FileRead(String),

    #[error("Failed to load shirt template image: {0}")]
    Fetch(String),

    #[error("Model returned text instead of an image: {0}")]
    ModelRefusal(String),

    #[error("Model returned neither image nor text")]
    EmptyResponse,

    #[error("Generation quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Generation backend misconfigured: {0}")]
    Configuration(String),

    #[error("{0}")]
    Backend(String),
}

impl TryOnError {
    /// Text rendered on the page for this failure.
    pub fn user_message(&self) -> String {
        match self {
            TryOnError::FileRead(message) => message.clone(),
            TryOnError::Fetch(_) => "Failed to generate image. Please try again.".to_string(),
            TryOnError::ModelRefusal(_) => {
                "AI model could not generate the image. Please try with a different photo or color."
                    .to_string()
            }
            TryOnError::EmptyResponse => {
                "No image data received from AI model. Please try again.".to_string()
            }
            TryOnError::QuotaExceeded(_) => "API quota exceeded. Please try again later.".to_string(),
            TryOnError::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            TryOnError::Configuration(_) => {
                "API configuration error. Please contact support.".to_string()
            }
            TryOnError::Backend(message) if message.trim().is_empty() => {
                "Failed to generate image. Please try again.".to_string()
            }
            TryOnError::Backend(message) => message.clone(),
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            TryOnError::FileRead(_) => Recovery::Reupload,
            TryOnError::Configuration(_) => Recovery::ContactSupport,
            TryOnError::Fetch(_)
            | TryOnError::ModelRefusal(_)
            | TryOnError::EmptyResponse
            | TryOnError::QuotaExceeded(_)
            | TryOnError::Network(_)
            | TryOnError::Backend(_) => Recovery::Retry,
        }
    }

    /// Stable label used for metrics and the API's `error.kind` field.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}
