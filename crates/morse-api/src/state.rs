//! # Application State
//!
//! Shared state passed to all route handlers via Axum's `State` extractor.
//! Holds immutable configuration and `Arc`-shared collaborators only; no
//! request-path locks live here.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use morse_core::{
    ArtifactResolver, DocumentStore, IdentityUrlFormatter, MemoryDocumentStore,
    MemoryObjectStore, ObjectStore, UrlFormatter,
};
use morse_crypto::TokenSigner;

use crate::config::AppConfig;
use crate::generation::ImageGenerator;
use crate::mailer::{LogMailer, Mailer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub objects: Arc<dyn ObjectStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn Mailer>,
    /// Try-on service. `None` means cache misses cannot be filled.
    pub generator: Option<Arc<dyn ImageGenerator>>,
    pub tokens: TokenSigner,
    pub url_formatter: Arc<dyn UrlFormatter>,
    /// Prometheus exporter handle; `/metrics` is served only when set.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("objects", &self.objects)
            .field("documents", &self.documents)
            .field("mailer", &self.mailer)
            .field("generator", &self.generator)
            .field("tokens", &self.tokens)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// State with in-memory collaborators and no generator.
    pub fn new(config: AppConfig) -> Self {
        let tokens = TokenSigner::new(config.secret_key.as_bytes(), config.access_token_ttl)
            .with_verification_ttl(config.verification_token_ttl);
        Self {
            config: Arc::new(config),
            objects: Arc::new(MemoryObjectStore::new()),
            documents: Arc::new(MemoryDocumentStore::new()),
            mailer: Arc::new(LogMailer),
            generator: None,
            tokens,
            url_formatter: Arc::new(IdentityUrlFormatter),
            metrics: None,
        }
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.objects = store;
        self
    }

    pub fn with_document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.documents = store;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_url_formatter(mut self, formatter: Arc<dyn UrlFormatter>) -> Self {
        self.url_formatter = formatter;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Character artifact resolver rooted at the configured image directory.
    pub fn resolver(&self) -> ArtifactResolver {
        ArtifactResolver::new(self.objects.clone(), self.config.main_image_root.clone())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
