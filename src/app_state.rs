use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::models::garment::Catalog;
use crate::services::generation::TryOnClient;
use crate::session::SessionStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub catalog: Arc<Catalog>,
    pub client: Arc<TryOnClient>,
    pub metrics: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionStore>,
        catalog: Arc<Catalog>,
        client: Arc<TryOnClient>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            sessions,
            catalog,
            client,
            metrics: metrics.map(Arc::new),
        }
    }
}
