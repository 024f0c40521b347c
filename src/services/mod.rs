pub mod asset_cache;
pub mod encoding;
pub mod generation;
