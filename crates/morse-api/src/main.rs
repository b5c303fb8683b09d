//! # morse-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Collaborators that are not configured fall
//! back to in-memory implementations with a warning.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use morse_api::config::AppConfig;
use morse_api::db::{self, PgDocumentStore};
use morse_api::generation::HttpImageGenerator;
use morse_api::state::AppState;
use morse_gcs::{GcsClient, GcsConfig};
use tracing_subscriber::EnvFilter;

const TRY_ON_TIMEOUT: Duration = Duration::from_secs(120);

fn init_tracing() {
    let filter = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");

    let port = config.port;
    let try_on_url = config.try_on_url.clone();
    let mut state = AppState::new(config);

    match GcsConfig::from_env() {
        Ok(gcs_config) => {
            let credentials = format!("{:?}", gcs_config.credentials);
            let client = GcsClient::new(gcs_config)?;
            tracing::info!(
                bucket = client.bucket(),
                %credentials,
                "object storage: Google Cloud Storage"
            );
            state = state.with_object_store(Arc::new(client));
        }
        Err(e) => {
            tracing::warn!("GCS not configured: {e}. Serving images from an empty in-memory store.");
        }
    }

    let pool = db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;
    if let Some(pool) = pool {
        state = state.with_document_store(Arc::new(PgDocumentStore::new(pool)));
    }

    match try_on_url {
        Some(url) => {
            tracing::info!(%url, "try-on generation service configured");
            state = state.with_generator(Arc::new(HttpImageGenerator::new(url, TRY_ON_TIMEOUT)?));
        }
        None => {
            tracing::warn!("TRY_ON_URL not set. Character cache misses will return 503.");
        }
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!("Prometheus recorder not installed: {e}"),
    }

    let app = morse_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Morseverse API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
