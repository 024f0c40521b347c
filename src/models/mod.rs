pub mod api;
pub mod garment;
pub mod gemini;
pub mod image;
pub mod view;
