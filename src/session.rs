//! Per-shopper view controller.
//!
//! [`TryOnSession`] is the synchronous state machine; [`SessionController`]
//! drives it around the asynchronous generation calls, and [`SessionStore`]
//! keeps one controller per browser session.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::TryOnError;
use crate::models::garment::{Catalog, GarmentOption};
use crate::models::image::{GeneratedImage, UploadedImage};
use crate::models::view::{Phase, ViewSnapshot, ViewState};
use crate::services::encoding::UploadEncoder;
use crate::services::generation::TryOnClient;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unknown garment: {0}")]
    UnknownGarment(String),

    #[error("Cannot {action} from the {screen} screen")]
    InvalidTransition {
        action: &'static str,
        screen: &'static str,
    },

    #[error("Session not found: {0}")]
    NotFound(Uuid),
}

/// Inputs for one generation call, tagged with its sequence number.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub seq: u64,
    pub image: UploadedImage,
    pub garment: GarmentOption,
}

pub struct TryOnSession {
    state: ViewState,
    last_seq: u64,
    catalog: Arc<Catalog>,
    last_touched: Instant,
}

impl TryOnSession {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            state: ViewState::Upload { error: None },
            last_seq: 0,
            catalog,
            last_touched: Instant::now(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Record shopper activity.
    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    /// Time since the last transition or view read.
    pub fn idle_for(&self) -> Duration {
        self.last_touched.elapsed()
    }

    /// A photo was read: show the product screen with the default garment.
    pub fn begin_upload(&mut self, image: UploadedImage) -> GenerationTicket {
        let garment = self.catalog.default_option().clone();
        self.start(image, garment)
    }

    /// A photo could not be read. The upload screen shows the error; on the
    /// product screen the current photo stays and the error is attached as
    /// `upload_error` until the next generation starts.
    pub fn upload_failed(&mut self, error: TryOnError) {
        self.touch();
        match &mut self.state {
            ViewState::Upload { error: current } => *current = Some(error),
            ViewState::Product { upload_error, .. } => *upload_error = Some(error),
        }
    }

    /// Switch garment and regenerate. Re-selecting the current garment is a
    /// no-op and returns `None`.
    pub fn select_garment(&mut self, label: &str) -> Result<Option<GenerationTicket>, SessionError> {
        self.touch();
        let garment = self
            .catalog
            .find(label)
            .cloned()
            .ok_or_else(|| SessionError::UnknownGarment(label.to_string()))?;

        match &self.state {
            ViewState::Upload { .. } => Err(SessionError::InvalidTransition {
                action: "select a garment",
                screen: "upload",
            }),
            ViewState::Product {
                garment: current, ..
            } if current.label == garment.label => Ok(None),
            ViewState::Product { image, .. } => {
                let image = image.clone();
                Ok(Some(self.start(image, garment)))
            }
        }
    }

    /// Regenerate with the current photo and garment.
    pub fn retry(&mut self) -> Result<GenerationTicket, SessionError> {
        self.touch();
        match &self.state {
            ViewState::Upload { .. } => Err(SessionError::InvalidTransition {
                action: "retry",
                screen: "upload",
            }),
            ViewState::Product {
                phase: Phase::Generating { .. },
                ..
            } => Err(SessionError::InvalidTransition {
                action: "retry",
                screen: "generating",
            }),
            ViewState::Product { image, garment, .. } => {
                let (image, garment) = (image.clone(), garment.clone());
                Ok(self.start(image, garment))
            }
        }
    }

    /// Return to the upload screen, dropping the photo and any result.
    pub fn back(&mut self) {
        self.touch();
        self.state = ViewState::Upload { error: None };
    }

    /// Apply a finished call. Returns `false` when the call was superseded
    /// and its result was discarded.
    pub fn complete(&mut self, seq: u64, result: Result<GeneratedImage, TryOnError>) -> bool {
        let ViewState::Product { phase, .. } = &mut self.state else {
            return false;
        };
        if !matches!(phase, Phase::Generating { seq: current } if *current == seq) {
            return false;
        }
        self.last_touched = Instant::now();
        *phase = match result {
            Ok(result) => Phase::Ready { result },
            Err(error) => Phase::Failed { error },
        };
        true
    }

    fn start(&mut self, image: UploadedImage, garment: GarmentOption) -> GenerationTicket {
        self.touch();
        self.last_seq += 1;
        let seq = self.last_seq;
        self.state = ViewState::Product {
            image: image.clone(),
            garment: garment.clone(),
            phase: Phase::Generating { seq },
            upload_error: None,
        };
        GenerationTicket {
            seq,
            image,
            garment,
        }
    }
}

/// Runs a session's transitions against the generation client.
///
/// Each generation runs on its own task and settles the session even when
/// the request that started it goes away. The state lock is released while
/// a generation is in flight, so a color change or `back` can land
/// meanwhile; the late result is then discarded.
pub struct SessionController {
    id: Uuid,
    session: Arc<Mutex<TryOnSession>>,
    client: Arc<TryOnClient>,
    encoder: UploadEncoder,
}

impl SessionController {
    pub fn new(
        id: Uuid,
        catalog: Arc<Catalog>,
        client: Arc<TryOnClient>,
        encoder: UploadEncoder,
    ) -> Self {
        Self {
            id,
            session: Arc::new(Mutex::new(TryOnSession::new(catalog))),
            client,
            encoder,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn state(&self) -> ViewState {
        self.session.lock().await.state().clone()
    }

    /// Current view. Reading it counts as activity.
    pub async fn snapshot(&self) -> ViewSnapshot {
        let mut session = self.session.lock().await;
        session.touch();
        ViewSnapshot::from_state(self.id, session.state())
    }

    pub async fn idle_for(&self) -> Duration {
        self.session.lock().await.idle_for()
    }

    /// Upload a photo from the page and generate with the default garment.
    pub async fn upload(&self, bytes: &[u8], declared_type: Option<&str>) -> ViewSnapshot {
        let encoded = self.encoder.encode_bytes(bytes, declared_type);
        self.accept_upload(encoded).await
    }

    /// Upload a photo from disk and generate with the default garment.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> ViewSnapshot {
        let encoded = self.encoder.encode_file(path).await;
        self.accept_upload(encoded).await
    }

    pub async fn select_garment(&self, label: &str) -> Result<ViewSnapshot, SessionError> {
        let ticket = self.session.lock().await.select_garment(label)?;
        if let Some(ticket) = ticket {
            tracing::info!(session_id = %self.id, garment = %ticket.garment.label, "Garment selected");
            self.run(ticket).await;
        }
        Ok(self.snapshot().await)
    }

    pub async fn retry(&self) -> Result<ViewSnapshot, SessionError> {
        let ticket = self.session.lock().await.retry()?;
        tracing::info!(session_id = %self.id, seq = ticket.seq, "Retrying generation");
        self.run(ticket).await;
        Ok(self.snapshot().await)
    }

    pub async fn back(&self) -> ViewSnapshot {
        self.session.lock().await.back();
        tracing::info!(session_id = %self.id, "Returned to upload screen");
        self.snapshot().await
    }

    async fn accept_upload(&self, encoded: Result<UploadedImage, TryOnError>) -> ViewSnapshot {
        match encoded {
            Ok(image) => {
                tracing::info!(
                    session_id = %self.id,
                    media_type = %image.media_type,
                    "Photo uploaded"
                );
                let ticket = self.session.lock().await.begin_upload(image);
                self.run(ticket).await;
            }
            Err(error) => {
                tracing::warn!(session_id = %self.id, error = %error, "Upload rejected");
                self.session.lock().await.upload_failed(error);
            }
        }
        self.snapshot().await
    }

    /// Generate on a detached task and wait for it to settle the session.
    async fn run(&self, ticket: GenerationTicket) {
        let session = self.session.clone();
        let client = self.client.clone();
        let id = self.id;
        let seq = ticket.seq;

        let task = tokio::spawn(async move {
            let result = client
                .edit_image_with_garment(&ticket.image, &ticket.garment)
                .await;
            settle(&session, id, seq, result).await;
        });

        if let Err(e) = task.await {
            tracing::error!(session_id = %id, seq, error = %e, "Generation task failed");
            settle(&self.session, id, seq, Err(TryOnError::Backend(String::new()))).await;
        }
    }
}

async fn settle(
    session: &Mutex<TryOnSession>,
    id: Uuid,
    seq: u64,
    result: Result<GeneratedImage, TryOnError>,
) {
    let applied = session.lock().await.complete(seq, result);
    if !applied {
        tracing::debug!(
            session_id = %id,
            seq,
            "Discarded superseded generation result"
        );
    }
}

/// All live sessions. Sessions idle past the TTL are evicted by
/// [`SessionStore::evict_idle`], usually from [`SessionStore::spawn_sweeper`].
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<SessionController>>>,
    catalog: Arc<Catalog>,
    client: Arc<TryOnClient>,
    encoder: UploadEncoder,
}

impl SessionStore {
    pub fn new(catalog: Arc<Catalog>, client: Arc<TryOnClient>, encoder: UploadEncoder) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            catalog,
            client,
            encoder,
        }
    }

    pub async fn create(&self) -> Arc<SessionController> {
        let id = Uuid::new_v4();
        let controller = Arc::new(SessionController::new(
            id,
            self.catalog.clone(),
            self.client.clone(),
            self.encoder,
        ));
        self.sessions.write().await.insert(id, controller.clone());
        metrics::gauge!("tryon_sessions").increment(1.0);
        tracing::info!(session_id = %id, "Session created");
        controller
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<SessionController>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    /// Drop every session idle for at least `ttl`. Returns how many were removed.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let controllers: Vec<_> = self.sessions.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for controller in controllers {
            if controller.idle_for().await >= ttl {
                expired.push(controller.id());
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let removed = expired
            .iter()
            .filter(|id| sessions.remove(*id).is_some())
            .count();
        drop(sessions);

        metrics::gauge!("tryon_sessions").decrement(removed as f64);
        tracing::info!(removed, ttl_secs = ttl.as_secs(), "Evicted idle sessions");
        removed
    }

    /// Evict idle sessions every `every` until the task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.evict_idle(ttl).await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
