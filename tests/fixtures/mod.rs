//! Test fixtures: tiny image files and the garment catalog

use std::path::{Path, PathBuf};

use tryon_hw::models::garment::Catalog;

/// Base URL the test catalog points its reference images at.
pub const ASSET_BASE_URL: &str = "http://assets.test/shirts";

/// Smallest byte sequence `image::guess_format` recognizes as JPEG, padded
/// with a JFIF header so it looks like a real upload.
pub const PHOTO_JPG: &[u8] =
    b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01\x01\x00\x00\x01\x00\x01\x00\x00\xFF\xD9";

pub const PHOTO_PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01";

pub const NOT_AN_IMAGE: &[u8] = b"%PDF-1.7 definitely not a portrait";

pub fn catalog() -> Catalog {
    Catalog::storefront(ASSET_BASE_URL)
}

pub fn garment_url(label: &str) -> String {
    catalog()
        .find(label)
        .map(|option| option.reference_image_url.clone())
        .unwrap_or_default()
}

/// Write `photo.jpg` into `dir` and return its path.
pub fn write_photo(dir: &Path) -> PathBuf {
    let path = dir.join("photo.jpg");
    std::fs::write(&path, PHOTO_JPG).expect("Failed to write photo fixture");
    path
}
