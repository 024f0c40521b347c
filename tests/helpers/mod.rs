//! Mock collaborators for driving the try-on flow without the network

use async_trait::async_trait;
use base64::Engine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

use tryon_hw::error::TryOnError;
use tryon_hw::models::gemini::{GenerateContentRequest, GenerateContentResponse, Part};
use tryon_hw::models::view::PhaseKind;
use tryon_hw::services::asset_cache::{AssetFetcher, EncodingCache};
use tryon_hw::services::encoding::UploadEncoder;
use tryon_hw::services::generation::{BackendError, GenerationBackend, TryOnClient};
use tryon_hw::session::{SessionController, SessionStore};

use crate::fixtures;

type Reply = dyn Fn(&GenerateContentRequest) -> Result<GenerateContentResponse, BackendError>
    + Send
    + Sync;

/// Backend that records requests and answers from a closure.
///
/// A gated backend parks every call until the test adds permits, so the
/// in-flight `Generating` phase can be observed.
pub struct MockBackend {
    reply: Box<Reply>,
    requests: Mutex<Vec<GenerateContentRequest>>,
    gate: Option<Semaphore>,
}

impl MockBackend {
    pub fn new<F>(reply: F) -> Arc<Self>
    where
        F: Fn(&GenerateContentRequest) -> Result<GenerateContentResponse, BackendError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            reply: Box::new(reply),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated<F>(reply: F) -> Arc<Self>
    where
        F: Fn(&GenerateContentRequest) -> Result<GenerateContentResponse, BackendError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            reply: Box::new(reply),
            requests: Mutex::new(Vec::new()),
            gate: Some(Semaphore::new(0)),
        })
    }

    /// Let `n` parked calls through.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerateContentRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Garment URLs of every call so far, in call order.
    pub fn garment_urls(&self) -> Vec<String> {
        self.requests().iter().map(garment_url_of).collect()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        (self.reply)(request)
    }
}

/// Serves each URL's own text as the image bytes, so a request's garment
/// part decodes back to the URL it came from.
#[derive(Default)]
pub struct MockFetcher {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl MockFetcher {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TryOnError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TryOnError::Fetch(format!("{} returned 404 Not Found", url)));
        }
        Ok(url.as_bytes().to_vec())
    }
}

/// Decode the second inline part of a request back into its garment URL.
pub fn garment_url_of(request: &GenerateContentRequest) -> String {
    let inline: Vec<&str> = request.contents[0]
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::InlineData { inline_data } => Some(inline_data.data.as_str()),
            _ => None,
        })
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(inline[1])
        .expect("garment part is not base64");
    String::from_utf8(bytes).expect("garment part is not a URL")
}

pub fn image_response(data: &str) -> GenerateContentResponse {
    serde_json::from_value(serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [
            { "inlineData": { "mimeType": "image/png", "data": data } }
        ] } }]
    }))
    .expect("invalid image response fixture")
}

pub fn text_response(text: &str) -> GenerateContentResponse {
    serde_json::from_value(serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [ { "text": text } ] } }]
    }))
    .expect("invalid text response fixture")
}

pub fn client(backend: Arc<MockBackend>, fetcher: Arc<MockFetcher>) -> Arc<TryOnClient> {
    Arc::new(TryOnClient::new(
        backend,
        fetcher,
        Arc::new(EncodingCache::new()),
    ))
}

pub fn controller(client: Arc<TryOnClient>) -> Arc<SessionController> {
    Arc::new(SessionController::new(
        Uuid::new_v4(),
        Arc::new(fixtures::catalog()),
        client,
        UploadEncoder::default(),
    ))
}

pub fn store(client: Arc<TryOnClient>) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(
        Arc::new(fixtures::catalog()),
        client,
        UploadEncoder::default(),
    ))
}

/// Poll until the session reaches `phase`, failing after two seconds.
pub async fn wait_for_phase(controller: &SessionController, phase: PhaseKind) {
    for _ in 0..200 {
        if controller.snapshot().await.phase == Some(phase) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never reached {:?}", phase);
}

/// Poll until the backend has received `n` calls, failing after two seconds.
pub async fn wait_for_calls(backend: &MockBackend, n: usize) {
    for _ in 0..200 {
        if backend.calls() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("backend saw {} calls, expected {}", backend.calls(), n);
}
