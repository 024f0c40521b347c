use base64::Engine;
use std::path::Path;

use crate::error::{TryOnError, FILE_LOAD_FAILED, INVALID_IMAGE_FILE};
use crate::models::image::{MediaType, UploadedImage};

/// Upload size advertised on the upload page.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Turns a selected or dropped image file into a base64 payload.
#[derive(Debug, Clone, Copy)]
pub struct UploadEncoder {
    max_bytes: usize,
}

impl Default for UploadEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl UploadEncoder {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Read an image from disk and encode it.
    pub async fn encode_file(&self, path: impl AsRef<Path>) -> Result<UploadedImage, TryOnError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read image file");
            TryOnError::FileRead(FILE_LOAD_FAILED.to_string())
        })?;
        self.encode_bytes(&bytes, None)
    }

    /// Encode uploaded bytes.
    ///
    /// The media type comes from the content itself; `declared_type` (the
    /// browser's guess) is only logged when it disagrees.
    pub fn encode_bytes(
        &self,
        bytes: &[u8],
        declared_type: Option<&str>,
    ) -> Result<UploadedImage, TryOnError> {
        if bytes.is_empty() {
            return Err(TryOnError::FileRead(FILE_LOAD_FAILED.to_string()));
        }

        if bytes.len() > self.max_bytes {
            tracing::warn!(
                size = bytes.len(),
                max = self.max_bytes,
                "Rejected oversized upload"
            );
            return Err(TryOnError::FileRead(format!(
                "Image is too large. Please upload a file under {} MB.",
                self.max_bytes / (1024 * 1024)
            )));
        }

        let media_type = MediaType::sniff(bytes).ok_or_else(|| {
            tracing::warn!(declared = ?declared_type, "Rejected upload with unsupported format");
            TryOnError::FileRead(INVALID_IMAGE_FILE.to_string())
        })?;

        if let Some(declared) = declared_type {
            if !declared.eq_ignore_ascii_case(media_type.as_ref()) {
                tracing::debug!(
                    declared,
                    detected = %media_type,
                    "Declared upload type differs from content"
                );
            }
        }

        Ok(UploadedImage {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01\x01\x00\x00\x01\x00\x01\x00\x00\xFF\xD9";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01";

    fn decode(data: &str) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .unwrap()
    }

    #[test]
    fn test_round_trip_preserves_bytes() {
        let encoder = UploadEncoder::default();
        for (bytes, expected) in [(JPEG, MediaType::Jpeg), (PNG, MediaType::Png)] {
            let image = encoder.encode_bytes(bytes, None).unwrap();
            assert_eq!(image.media_type, expected);
            let decoded = decode(&image.data);
            assert_eq!(decoded.len(), bytes.len());
            assert_eq!(decoded, bytes);
        }
    }

    #[test]
    fn test_content_wins_over_declared_type() {
        let image = UploadEncoder::default()
            .encode_bytes(PNG, Some("image/jpeg"))
            .unwrap();
        assert_eq!(image.media_type, MediaType::Png);
    }

    #[test]
    fn test_rejects_unsupported_format() {
        let err = UploadEncoder::default()
            .encode_bytes(b"GIF89a\x01\x00\x01\x00", Some("image/gif"))
            .unwrap_err();
        assert_eq!(err, TryOnError::FileRead(INVALID_IMAGE_FILE.to_string()));
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let encoder = UploadEncoder::new(8);
        assert!(matches!(
            encoder.encode_bytes(&[], None),
            Err(TryOnError::FileRead(_))
        ));
        let err = encoder.encode_bytes(PNG, None).unwrap_err();
        assert!(matches!(err, TryOnError::FileRead(ref m) if m.contains("too large")));
    }

    #[tokio::test]
    async fn test_encode_file_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(JPEG).unwrap();

        let image = UploadEncoder::default()
            .encode_file(file.path())
            .await
            .unwrap();
        assert_eq!(image.media_type, MediaType::Jpeg);
        assert_eq!(decode(&image.data), JPEG);
    }

    #[tokio::test]
    async fn test_missing_file_is_file_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadEncoder::default()
            .encode_file(dir.path().join("photo.jpg"))
            .await
            .unwrap_err();
        assert_eq!(err, TryOnError::FileRead(FILE_LOAD_FAILED.to_string()));
    }
}
