use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Image types accepted from the upload surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
pub enum MediaType {
    #[serde(rename = "image/png")]
    #[strum(to_string = "image/png")]
    Png,

    #[serde(rename = "image/jpeg")]
    #[strum(to_string = "image/jpeg", serialize = "image/jpg")]
    Jpeg,

    #[serde(rename = "image/webp")]
    #[strum(to_string = "image/webp")]
    Webp,
}

impl MediaType {
    pub fn from_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(MediaType::Png),
            image::ImageFormat::Jpeg => Some(MediaType::Jpeg),
            image::ImageFormat::WebP => Some(MediaType::Webp),
            _ => None,
        }
    }

    /// Detect the media type from the file's magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        image::guess_format(bytes).ok().and_then(Self::from_format)
    }
}

/// The shopper's photo, base64-encoded, as read from the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub data: String,
    pub media_type: MediaType,
}

impl UploadedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Image returned by the generation backend, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub data: String,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}
