//! GCS client configuration.
//!
//! The bucket and credential source come from the environment. Defaults
//! point at the public GCS endpoint; tests override `base_url` with a mock
//! server.

use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";
pub const DEFAULT_BUCKET: &str = "your-gcs-bucket";

/// Where request credentials come from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Application Default Credentials, refreshed before expiry.
    ApplicationDefault,
    /// A fixed bearer token. It is never refreshed.
    Static(String),
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApplicationDefault => f.write_str("ApplicationDefault"),
            Self::Static(_) => f.write_str("Static([REDACTED])"),
        }
    }
}

/// Configuration for the GCS JSON API client.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    /// API root. Default: <https://storage.googleapis.com>
    pub base_url: Url,
    pub bucket: String,
    pub credentials: CredentialSource,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl GcsConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GOOGLE_APPLICATION_CREDENTIALS`: service-account key file
    /// - `GCS_USE_METADATA_SERVER`: `true` to use the GCP metadata server
    /// - `GCS_ACCESS_TOKEN`: fixed token, takes precedence over the above
    /// - `GCS_BUCKET_NAME` (default: `your-gcs-bucket`)
    /// - `GCS_BASE_URL` (default: `https://storage.googleapis.com`)
    /// - `GCS_TIMEOUT_SECS` (default: 30)
    ///
    /// One of the first three is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = credential_source(|key| std::env::var(key).ok())?;

        Ok(Self {
            base_url: env_url("GCS_BASE_URL", DEFAULT_BASE_URL)?,
            bucket: std::env::var("GCS_BUCKET_NAME").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
            credentials,
            timeout_secs: std::env::var("GCS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Configuration pointing at a local mock server.
    pub fn local_mock(base_url: &str, bucket: &str, token: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?,
            bucket: bucket.to_string(),
            credentials: CredentialSource::Static(token.to_string()),
            timeout_secs: 5,
        })
    }
}

fn credential_source(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<CredentialSource, ConfigError> {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = var("GCS_ACCESS_TOKEN") {
        return Ok(CredentialSource::Static(token));
    }
    let metadata = var("GCS_USE_METADATA_SERVER")
        .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"));
    if var("GOOGLE_APPLICATION_CREDENTIALS").is_some() || metadata {
        return Ok(CredentialSource::ApplicationDefault);
    }
    Err(ConfigError::MissingCredentials)
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "no GCS credentials: set GOOGLE_APPLICATION_CREDENTIALS, GCS_USE_METADATA_SERVER, or GCS_ACCESS_TOKEN"
    )]
    MissingCredentials,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("base URL {0} cannot carry path segments")]
    CannotBeABase(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = GcsConfig::local_mock("http://127.0.0.1:9100", "bucket", "tok").unwrap();
        assert_eq!(cfg.bucket, "bucket");
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:9100/");
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("NONEXISTENT_GCS_VAR_12345", DEFAULT_BASE_URL).unwrap();
        assert_eq!(url.as_str(), "https://storage.googleapis.com/");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = GcsConfig::local_mock("http://127.0.0.1:9100", "b", "super-secret").unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn credential_source_precedence() {
        let from = |pairs: &[(&str, &str)]| {
            let pairs: Vec<(String, String)> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            credential_source(move |key| {
                pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
            })
        };

        assert!(matches!(from(&[]), Err(ConfigError::MissingCredentials)));
        assert_eq!(
            from(&[("GOOGLE_APPLICATION_CREDENTIALS", "/keys/sa.json")]).unwrap(),
            CredentialSource::ApplicationDefault
        );
        assert_eq!(
            from(&[("GCS_USE_METADATA_SERVER", "true")]).unwrap(),
            CredentialSource::ApplicationDefault
        );
        assert_eq!(
            from(&[
                ("GOOGLE_APPLICATION_CREDENTIALS", "/keys/sa.json"),
                ("GCS_ACCESS_TOKEN", "tok"),
            ])
            .unwrap(),
            CredentialSource::Static("tok".into())
        );
        assert!(matches!(
            from(&[("GCS_ACCESS_TOKEN", "  ")]),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn invalid_mock_url_is_rejected() {
        assert!(matches!(
            GcsConfig::local_mock("not a url", "b", "t"),
            Err(ConfigError::InvalidUrl(_, _))
        ));
    }
}
