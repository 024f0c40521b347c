use serde::Deserialize;
use std::time::Duration;

use crate::services::encoding::DEFAULT_MAX_UPLOAD_BYTES;
use crate::services::generation::{DEFAULT_API_BASE, DEFAULT_MODEL};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Gemini API key. Required; `API_KEY` is accepted as a fallback.
    #[serde(default)]
    gemini_api_key: Option<String>,

    #[serde(default)]
    api_key: Option<String>,

    /// Gemini REST base URL
    #[serde(default = "default_api_base")]
    pub gemini_api_base: String,

    /// Image-capable Gemini model
    #[serde(default = "default_model")]
    pub gemini_model: String,

    /// Timeout for generation calls and reference image fetches, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base URL the garment reference images are fetched from
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,

    /// Directory served under `/assets`
    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,

    /// Largest accepted photo upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Idle time after which a session is dropped, in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// How often idle sessions are swept, in seconds
    #[serde(default = "default_session_sweep_secs")]
    pub session_sweep_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_asset_base_url() -> String {
    "http://127.0.0.1:3000/assets".to_string()
}

fn default_asset_dir() -> String {
    "./public".to_string()
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_session_sweep_secs() -> u64 {
    60
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("GEMINI_API_KEY environment variable is not set.")]
    MissingApiKey,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit variables; fails when no API key is present.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config: AppConfig = envy::from_iter(vars)?;
        let key = [config.gemini_api_key.take(), config.api_key.take()]
            .into_iter()
            .flatten()
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        config.gemini_api_key = Some(key);
        Ok(config)
    }

    pub fn gemini_api_key(&self) -> &str {
        self.gemini_api_key.as_deref().unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Sweep period, never zero.
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs.max(1))
    }
}
