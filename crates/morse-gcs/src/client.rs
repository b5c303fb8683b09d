//! Typed client for the GCS JSON API.
//!
//! ## API Paths
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/storage/v1/b/{bucket}/o/{object}` | Object metadata |
//! | GET    | `/storage/v1/b/{bucket}/o/{object}?alt=media` | Download |
//! | POST   | `/upload/storage/v1/b/{bucket}/o?uploadType=media&name={object}` | Simple upload |
//! | GET    | `/storage/v1/b/{bucket}/o?prefix={prefix}&pageToken={token}` | List |
//!
//! Object names are a single percent-encoded path segment, so `/` inside a
//! name is sent as `%2F`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use morse_core::{ObjectStore, StorageError};
use serde::Deserialize;
use url::Url;

use crate::config::{ConfigError, CredentialSource, GcsConfig};
use crate::credentials::{GoogleCredentials, StaticToken, TokenProvider};
use crate::error::GcsError;

/// Object resource fields this client reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    #[serde(default)]
    pub bucket: Option<String>,
    /// Size in bytes. GCS encodes it as a decimal string.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<ObjectMetadata>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Client for one GCS bucket.
#[derive(Debug, Clone)]
pub struct GcsClient {
    http: reqwest::Client,
    base_url: Url,
    bucket: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GcsClient {
    /// Create a new client, loading credentials from `config.credentials`.
    pub fn new(config: GcsConfig) -> Result<Self, GcsError> {
        let tokens: Arc<dyn TokenProvider> = match &config.credentials {
            CredentialSource::Static(token) => Arc::new(StaticToken::new(token)?),
            CredentialSource::ApplicationDefault => Arc::new(GoogleCredentials::application_default()?),
        };
        Self::with_token_provider(config, tokens)
    }

    /// Create a client that takes request credentials from `tokens`.
    /// `config.credentials` is ignored.
    pub fn with_token_provider(
        config: GcsConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, GcsError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ConfigError::CannotBeABase(config.base_url.to_string()).into());
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GcsError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url,
            bucket: config.bucket,
            tokens,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `{base}/{prefix...}/b/{bucket}/o[/{object}]` with each part encoded
    /// as one path segment.
    fn url(&self, api_root: &[&str], object: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejected cannot-be-a-base URLs, so segments are available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(api_root);
            segments.extend(["b", self.bucket.as_str(), "o"]);
            if let Some(object) = object {
                segments.push(object);
            }
        }
        url
    }

    /// Send an authorized request. A 401 invalidates the credentials and the
    /// request is sent once more with fresh ones.
    async fn send(
        &self,
        endpoint: &str,
        build: impl Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GcsError> {
        let resp = self.send_once(endpoint, &build).await?;
        if resp.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }
        tracing::info!(endpoint, "GCS rejected credentials, retrying with fresh token");
        self.tokens.invalidate();
        self.send_once(endpoint, &build).await
    }

    async fn send_once(
        &self,
        endpoint: &str,
        build: &impl Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GcsError> {
        let headers = self.tokens.headers().await?;
        build(&self.http)
            .headers(headers)
            .send()
            .await
            .map_err(|e| GcsError::Http {
                endpoint: endpoint.to_string(),
                source: e,
            })
    }

    /// Fetch object metadata. Returns `None` for a missing object.
    ///
    /// Calls `GET {base}/storage/v1/b/{bucket}/o/{object}`.
    pub async fn metadata(&self, object: &str) -> Result<Option<ObjectMetadata>, GcsError> {
        let endpoint = format!("GET metadata {object}");
        let url = self.url(&["storage", "v1"], Some(object));
        let resp = self.send(&endpoint, |http| http.get(url.clone())).await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(&endpoint, resp).await?;
        resp.json()
            .await
            .map(Some)
            .map_err(|e| GcsError::Deserialization {
                endpoint,
                source: e,
            })
    }

    /// Download object content. Returns `None` for a missing object.
    ///
    /// Calls `GET {base}/storage/v1/b/{bucket}/o/{object}?alt=media`.
    pub async fn download(&self, object: &str) -> Result<Option<Vec<u8>>, GcsError> {
        let endpoint = format!("GET media {object}");
        let mut url = self.url(&["storage", "v1"], Some(object));
        url.query_pairs_mut().append_pair("alt", "media");
        let resp = self.send(&endpoint, |http| http.get(url.clone())).await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(&endpoint, resp).await?;
        resp.bytes()
            .await
            .map(|b| Some(b.to_vec()))
            .map_err(|e| GcsError::Http {
                endpoint,
                source: e,
            })
    }

    /// Upload `bytes` as `object`, replacing any existing object.
    ///
    /// Calls `POST {base}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={object}`.
    pub async fn upload(&self, object: &str, bytes: Vec<u8>) -> Result<ObjectMetadata, GcsError> {
        let endpoint = format!("POST upload {object}");
        let mut url = self.url(&["upload", "storage", "v1"], None);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);
        let body = Bytes::from(bytes);
        let resp = self
            .send(&endpoint, |http| {
                http.post(url.clone())
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(body.clone())
            })
            .await?;

        let resp = ensure_success(&endpoint, resp).await?;
        resp.json().await.map_err(|e| GcsError::Deserialization {
            endpoint,
            source: e,
        })
    }

    /// List object names under `prefix`, following page tokens.
    ///
    /// With `max_results` set, only the first page is requested.
    ///
    /// Calls `GET {base}/storage/v1/b/{bucket}/o?prefix={prefix}`.
    pub async fn list_objects(
        &self,
        prefix: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<String>, GcsError> {
        let endpoint = format!("GET list {prefix}");
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(&["storage", "v1"], None);
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if let Some(max) = max_results {
                    query.append_pair("maxResults", &max.to_string());
                }
                if let Some(token) = page_token.as_deref() {
                    query.append_pair("pageToken", token);
                }
            }
            let resp = self.send(&endpoint, |http| http.get(url.clone())).await?;
            let resp = ensure_success(&endpoint, resp).await?;
            let page: ListObjectsResponse =
                resp.json().await.map_err(|e| GcsError::Deserialization {
                    endpoint: endpoint.clone(),
                    source: e,
                })?;

            names.extend(page.items.into_iter().map(|item| item.name));
            match page.next_page_token {
                Some(token) if max_results.is_none() && !token.is_empty() => {
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        tracing::debug!(prefix, count = names.len(), "listed GCS objects");
        Ok(names)
    }
}

async fn ensure_success(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, GcsError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(GcsError::ApiError {
        endpoint: endpoint.to_string(),
        status,
        body,
    })
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.metadata(path).await?.is_some())
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<String>, StorageError> {
        Ok(self.list_objects(prefix, Some(1)).await?.into_iter().next())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.download(path)
            .await?
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.upload(path, bytes).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self.list_objects(prefix, None).await?)
    }
}
