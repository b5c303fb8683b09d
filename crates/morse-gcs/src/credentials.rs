//! Request credentials for the GCS JSON API.
//!
//! [`GcsClient`](crate::GcsClient) asks its [`TokenProvider`] for
//! authorization headers on every request. After a 401 it calls
//! [`TokenProvider::invalidate`] and retries once with fresh headers.

use async_trait::async_trait;
use google_cloud_auth::credentials::{self, CacheableResource, Credentials, EntityTag};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::GcsError;

/// OAuth scope for bucket reads and writes.
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

/// Source of authorization headers.
#[async_trait]
pub trait TokenProvider: Send + Sync + std::fmt::Debug {
    /// Headers to attach to the next request.
    async fn headers(&self) -> Result<HeaderMap, GcsError>;

    /// GCS rejected the last headers. The next [`headers`](Self::headers)
    /// call must not reuse them.
    fn invalidate(&self) {}
}

/// A fixed bearer token, for emulators and short-lived local runs.
pub struct StaticToken {
    header: HeaderValue,
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl StaticToken {
    pub fn new(token: &str) -> Result<Self, GcsError> {
        let mut header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GcsError::Auth("access token is not a valid header value".into()))?;
        header.set_sensitive(true);
        Ok(Self { header })
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn headers(&self) -> Result<HeaderMap, GcsError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.header.clone());
        Ok(headers)
    }
}

/// Application Default Credentials: the service-account key named by
/// `GOOGLE_APPLICATION_CREDENTIALS`, or the metadata server on GCP.
///
/// The underlying credentials refresh their token before it expires. The
/// last headers are kept with their entity tag so an unchanged token is
/// not rebuilt.
pub struct GoogleCredentials {
    credentials: Credentials,
    cached: Mutex<Option<(EntityTag, HeaderMap)>>,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("cached", &self.cached.lock().is_some())
            .finish()
    }
}

impl GoogleCredentials {
    pub fn application_default() -> Result<Self, GcsError> {
        let credentials = credentials::Builder::default()
            .with_scopes([STORAGE_SCOPE])
            .build()
            .map_err(|e| GcsError::Auth(format!("loading application default credentials: {e}")))?;
        Ok(Self::from_credentials(credentials))
    }

    pub fn from_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for GoogleCredentials {
    async fn headers(&self) -> Result<HeaderMap, GcsError> {
        let mut extensions = http::Extensions::new();
        let previous = self.cached.lock().clone();
        if let Some((tag, _)) = &previous {
            extensions.insert(tag.clone());
        }

        let resource = self
            .credentials
            .headers(extensions)
            .await
            .map_err(|e| GcsError::Auth(format!("fetching access token: {e}")))?;

        match (resource, previous) {
            (CacheableResource::New { entity_tag, data }, _) => {
                *self.cached.lock() = Some((entity_tag, data.clone()));
                Ok(data)
            }
            (CacheableResource::NotModified, Some((_, headers))) => Ok(headers),
            (CacheableResource::NotModified, None) => {
                Err(GcsError::Auth("credentials returned no headers".into()))
            }
        }
    }

    fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_sets_bearer_header() {
        let provider = StaticToken::new("abc").unwrap();
        let headers = provider.headers().await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn static_token_rejects_header_breaking_input() {
        assert!(matches!(
            StaticToken::new("bad\ntoken"),
            Err(GcsError::Auth(_))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", StaticToken::new("super-secret").unwrap());
        assert!(!debug.contains("super-secret"));
    }
}
