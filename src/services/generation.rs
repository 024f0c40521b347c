use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::TryOnError;
use crate::models::garment::GarmentOption;
use crate::models::gemini::{
    ApiErrorEnvelope, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Modality, Part,
};
use crate::models::image::{GeneratedImage, UploadedImage};
use crate::services::asset_cache::{AssetFetcher, EncodingCache};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Garment reference images are stored as PNG.
const GARMENT_MIME_TYPE: &str = "image/png";

/// Raw failure from a generation backend, before classification.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

/// Hosted multimodal model that performs the compositing.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BackendError>;
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiBackend {
    http: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(
        api_key: &str,
        api_base: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            model: model.trim().to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BackendError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
                Ok(envelope) if !envelope.error.status.is_empty() => {
                    format!("{}: {}", envelope.error.status, envelope.error.message)
                }
                Ok(envelope) => envelope.error.message,
                Err(_) => body,
            };
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Instruction sent alongside the two images.
pub fn instruction_for(color: &str) -> String {
    format!(
        "Using the two provided images: Edit the first image (the person's portrait) to show them \
         wearing the t-shirt from the second image. The t-shirt should be colored {color} and fit \
         the person's body naturally, replacing any existing clothing on their upper body. Keep the \
         person's face, hair, skin tone, pose, and background exactly the same. Make it look \
         natural and realistic, as if they were originally wearing this {color} t-shirt. Return \
         only the edited image."
    )
}

/// Compose the request: user photo, garment reference, then the instruction.
pub fn build_request(
    image: &UploadedImage,
    garment_data: String,
    color: &str,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: None,
            parts: vec![
                Part::inline(image.media_type.to_string(), image.data.clone()),
                Part::inline(GARMENT_MIME_TYPE, garment_data),
                Part::text(instruction_for(color)),
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec![Modality::Image, Modality::Text],
        },
    }
}

/// Pull the edited image out of a response, or say why there is none.
pub fn extract_image(response: &GenerateContentResponse) -> Result<GeneratedImage, TryOnError> {
    if let Some(inline) = response.first_image() {
        let mime_type = if inline.mime_type.is_empty() {
            GARMENT_MIME_TYPE.to_string()
        } else {
            inline.mime_type.clone()
        };
        return Ok(GeneratedImage {
            data: inline.data.clone(),
            mime_type,
        });
    }

    if let Some(text) = response.text() {
        tracing::warn!(text = %text, "Gemini returned text instead of image");
        return Err(TryOnError::ModelRefusal(text));
    }

    if let Some(reason) = response.block_reason() {
        tracing::warn!(block_reason = reason, "Gemini blocked the prompt");
    }
    Err(TryOnError::EmptyResponse)
}

/// Map a raw backend failure onto the user-facing categories.
pub fn classify(error: &BackendError) -> TryOnError {
    match error {
        BackendError::Http(e) if e.is_timeout() || e.is_connect() => {
            TryOnError::Network(e.to_string())
        }
        BackendError::Api { status, message }
            if *status == StatusCode::TOO_MANY_REQUESTS.as_u16() =>
        {
            TryOnError::QuotaExceeded(message.clone())
        }
        BackendError::Api { status, message }
            if *status == StatusCode::UNAUTHORIZED.as_u16()
                || *status == StatusCode::FORBIDDEN.as_u16() =>
        {
            TryOnError::Configuration(message.clone())
        }
        BackendError::Api { message, .. } => classify_message(message),
        BackendError::Http(e) => classify_message(&e.to_string()),
        BackendError::Other(message) => classify_message(message),
    }
}

/// Keyword classification of a failure description.
pub fn classify_message(message: &str) -> TryOnError {
    let lower = message.to_lowercase();
    if lower.contains("quota") || message.contains("RESOURCE_EXHAUSTED") {
        TryOnError::QuotaExceeded(message.to_string())
    } else if lower.contains("network") || lower.contains("fetch") {
        TryOnError::Network(message.to_string())
    } else if lower.contains("api key") {
        TryOnError::Configuration(message.to_string())
    } else {
        TryOnError::Backend(message.to_string())
    }
}

/// Renders a shopper wearing a chosen garment.
pub struct TryOnClient {
    backend: Arc<dyn GenerationBackend>,
    fetcher: Arc<dyn AssetFetcher>,
    cache: Arc<EncodingCache>,
}

impl TryOnClient {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        fetcher: Arc<dyn AssetFetcher>,
        cache: Arc<EncodingCache>,
    ) -> Self {
        Self {
            backend,
            fetcher,
            cache,
        }
    }

    pub fn cache(&self) -> &EncodingCache {
        &self.cache
    }

    /// One generation attempt. No retries; the page offers those.
    pub async fn edit_image_with_garment(
        &self,
        image: &UploadedImage,
        garment: &GarmentOption,
    ) -> Result<GeneratedImage, TryOnError> {
        metrics::counter!("tryon_generations_total").increment(1);
        let start = Instant::now();

        let result = self.generate(image, garment).await;

        let elapsed = start.elapsed();
        metrics::histogram!("tryon_generation_seconds").record(elapsed.as_secs_f64());

        match &result {
            Ok(generated) => tracing::info!(
                garment = %garment.label,
                duration_ms = elapsed.as_millis() as u64,
                size = generated.data.len(),
                "Generation complete"
            ),
            Err(e) => {
                metrics::counter!("tryon_generation_failures_total", "kind" => e.kind())
                    .increment(1);
                tracing::error!(
                    garment = %garment.label,
                    kind = e.kind(),
                    error = %e,
                    "Generation failed"
                );
            }
        }

        result
    }

    async fn generate(
        &self,
        image: &UploadedImage,
        garment: &GarmentOption,
    ) -> Result<GeneratedImage, TryOnError> {
        let garment_data = self
            .cache
            .get_or_fetch(&garment.reference_image_url, self.fetcher.as_ref())
            .await?;

        let request = build_request(image, garment_data, &garment.label);

        tracing::debug!(
            garment = %garment.label,
            media_type = %image.media_type,
            "Calling Gemini generateContent"
        );
        let response = self
            .backend
            .generate_content(&request)
            .await
            .map_err(|e| classify(&e))?;

        extract_image(&response)
    }
}
