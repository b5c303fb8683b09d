//! # Service Configuration
//!
//! Built once at startup from the environment and shared read-only through
//! [`crate::state::AppState`]. Object storage credentials are loaded
//! separately by [`morse_gcs::GcsConfig::from_env`].

use chrono::Duration;

/// Development signing secret, rejected when `PRODUCTION` is set.
const DEV_SECRET_KEY: &str = "morseverse-dev-secret-key";

/// Origins allowed by CORS when `CORS_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGINS: [&str; 5] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "https://www.morseverse.com",
    "https://morseverse.com/ai_agent",
    "https://accounts.google.com",
];

/// Runtime configuration for the API service.
///
/// Custom `Debug` implementation redacts `secret_key`.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Production mode. Cookies are marked `Secure`.
    pub production: bool,
    /// HMAC key for access tokens.
    pub secret_key: String,
    pub access_token_ttl: Duration,
    /// Lifetime of the token mailed in verification links.
    pub verification_token_ttl: Duration,
    /// Public base URL used in verification links.
    pub domain: String,
    /// Object path of the project coordinates document.
    pub coordinates_path: String,
    /// Prefix under which catalog categories live.
    pub recommendation_prefix: String,
    /// Root directory of generated character images.
    pub main_image_root: String,
    /// Try-on generation endpoint. `None` disables generation.
    pub try_on_url: Option<String>,
    pub cors_origins: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("production", &self.production)
            .field("secret_key", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("verification_token_ttl", &self.verification_token_ttl)
            .field("domain", &self.domain)
            .field("coordinates_path", &self.coordinates_path)
            .field("recommendation_prefix", &self.recommendation_prefix)
            .field("main_image_root", &self.main_image_root)
            .field("try_on_url", &self.try_on_url)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            production: false,
            secret_key: DEV_SECRET_KEY.to_string(),
            access_token_ttl: Duration::minutes(120),
            verification_token_ttl: Duration::minutes(
                morse_crypto::DEFAULT_VERIFICATION_TTL_MINUTES,
            ),
            domain: "http://127.0.0.1:8000".to_string(),
            coordinates_path: "path/to/coordinates.json".to_string(),
            recommendation_prefix: "path/to/recommendations".to_string(),
            main_image_root: "path/to/image".to_string(),
            try_on_url: None,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8000)
    /// - `PRODUCTION` (`true`/`1` enables production mode)
    /// - `SECRET_KEY` (required in production)
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES` (default: 120)
    /// - `VERIFICATION_TOKEN_EXPIRE_MINUTES` (default: 1440)
    /// - `DOMAIN` (default: `http://127.0.0.1:8000`)
    /// - `GCS_FILE_PATH`, `GCS_RECOMMENDATION_PATH`, `GCS_MAIN_IMAGE_DIRECTORY`
    /// - `TRY_ON_URL` (optional)
    /// - `CORS_ORIGINS` (comma-separated)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let production = var("PRODUCTION")
            .map(|v| parse_bool("PRODUCTION", &v))
            .transpose()?
            .unwrap_or(false);

        let secret_key = match var("SECRET_KEY") {
            Some(key) => key,
            None if production => return Err(ConfigError::MissingSecretKey),
            None => defaults.secret_key,
        };

        let port = var("PORT")
            .map(|v| parse_number::<u16>("PORT", &v))
            .transpose()?
            .unwrap_or(defaults.port);

        let ttl_minutes = parse_minutes(&var, "ACCESS_TOKEN_EXPIRE_MINUTES", 120)?;
        let verification_minutes = parse_minutes(
            &var,
            "VERIFICATION_TOKEN_EXPIRE_MINUTES",
            morse_crypto::DEFAULT_VERIFICATION_TTL_MINUTES,
        )?;

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        Ok(Self {
            port,
            production,
            secret_key,
            access_token_ttl: Duration::minutes(ttl_minutes),
            verification_token_ttl: Duration::minutes(verification_minutes),
            domain: var("DOMAIN").unwrap_or(defaults.domain),
            coordinates_path: var("GCS_FILE_PATH").unwrap_or(defaults.coordinates_path),
            recommendation_prefix: var("GCS_RECOMMENDATION_PATH")
                .unwrap_or(defaults.recommendation_prefix),
            main_image_root: var("GCS_MAIN_IMAGE_DIRECTORY").unwrap_or(defaults.main_image_root),
            try_on_url: var("TRY_ON_URL"),
            cors_origins,
        })
    }
}

fn parse_minutes(
    var: impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
) -> Result<i64, ConfigError> {
    let minutes = var(key)
        .map(|v| parse_number::<i64>(key, &v))
        .transpose()?
        .unwrap_or(default);
    if minutes <= 0 {
        return Err(ConfigError::Invalid {
            var: key.into(),
            reason: "must be positive".into(),
        });
    }
    Ok(minutes)
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SECRET_KEY must be set in production")]
    MissingSecretKey,
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
