//! Virtual try-on storefront
//!
//! This library provides the core functionality for the tryon-hw service:
//! a shopper uploads a portrait, picks a t-shirt color, and the photo is sent
//! to Gemini together with the garment reference image to render the shopper
//! wearing it.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
