use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tryon_hw::{
    app_state::AppState,
    config::AppConfig,
    models::garment::Catalog,
    routes,
    services::{
        asset_cache::{EncodingCache, HttpAssetFetcher},
        encoding::UploadEncoder,
        generation::{GeminiBackend, TryOnClient},
    },
    session::SessionStore,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment; a missing API key stops here
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing tryon-hw server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    // Register application metrics
    metrics::describe_counter!("tryon_generations_total", "Total try-on generation calls");
    metrics::describe_counter!(
        "tryon_generation_failures_total",
        "Try-on generation calls that failed, by kind"
    );
    metrics::describe_histogram!(
        "tryon_generation_seconds",
        "Time spent on one try-on generation call"
    );
    metrics::describe_counter!(
        "tryon_asset_cache_hits_total",
        "Garment reference images served from the cache"
    );
    metrics::describe_counter!(
        "tryon_asset_cache_misses_total",
        "Garment reference images fetched over the network"
    );
    metrics::describe_gauge!(
        "tryon_sessions",
        "Live try-on sessions, decremented when idle sessions are evicted"
    );

    // Initialize Gemini client
    tracing::info!(model = %config.gemini_model, "Initializing Gemini client");
    let backend = GeminiBackend::new(
        config.gemini_api_key(),
        &config.gemini_api_base,
        &config.gemini_model,
        config.request_timeout(),
    )
    .expect("Failed to initialize Gemini client");

    let fetcher = HttpAssetFetcher::new(config.request_timeout())
        .expect("Failed to initialize asset fetcher");

    let client = Arc::new(TryOnClient::new(
        Arc::new(backend),
        Arc::new(fetcher),
        Arc::new(EncodingCache::new()),
    ));

    tracing::info!(asset_base_url = %config.asset_base_url, "Loading garment catalog");
    let catalog = Arc::new(Catalog::storefront(&config.asset_base_url));

    let sessions = Arc::new(SessionStore::new(
        catalog.clone(),
        client.clone(),
        UploadEncoder::new(config.max_upload_bytes),
    ));

    // Drop sessions the shopper has walked away from
    tracing::info!(ttl_secs = config.session_ttl_secs, "Starting session sweeper");
    sessions.spawn_sweeper(config.session_ttl(), config.session_sweep_interval());

    // Create shared application state
    let state = AppState::new(sessions, catalog, client, Some(prometheus_handle));

    let app = routes::router(state, &config.asset_dir, config.max_upload_bytes);

    tracing::info!("Starting tryon-hw on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
