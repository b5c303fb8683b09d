//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from morse-core and morse-crypto to HTTP status codes.
//! Internal error details are logged, never returned to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use morse_core::{ArtifactError, CatalogError, DocumentError, ProjectError, StorageError};
use morse_crypto::{CryptoError, TokenError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("{0}")]
    Validation(String),

    /// Request rejected by a business rule or could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// A required collaborator is not configured (503).
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub(crate) fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => Self::NotFound(err.to_string()),
            StorageError::Upstream(_) | StorageError::Decode { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::EmptySubject
            | ArtifactError::UnsupportedSubject(_)
            | ArtifactError::InvalidGender(_) => Self::BadRequest(err.to_string()),
            ArtifactError::ReferenceNotFound(_) => Self::NotFound(err.to_string()),
            ArtifactError::GenerationFailed(_) => Self::Internal(err.to_string()),
            ArtifactError::Storage(inner) => inner.into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ProjectError> for AppError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound(_) => Self::NotFound(err.to_string()),
            ProjectError::Malformed(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<CryptoError> for AppError {
    fn from(err: CryptoError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        tracing::debug!(error = %err, "rejected access token");
        Self::Unauthorized("Could not validate credentials".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (
                AppError::ServiceUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
            ),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let (status, body) = body_json(AppError::BadRequest("Email already registered".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["message"], "Email already registered");
    }

    #[tokio::test]
    async fn internal_errors_are_not_leaked() {
        let (status, body) = body_json(AppError::Internal("connection refused to 10.0.0.3".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn storage_errors_map_by_kind() {
        assert!(matches!(
            AppError::from(StorageError::NotFound("a.png".into())),
            AppError::NotFound(m) if m == "file a.png not found"
        ));
        assert!(matches!(
            AppError::from(StorageError::Upstream("boom".into())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn artifact_errors_map_by_kind() {
        assert!(matches!(
            AppError::from(ArtifactError::InvalidGender("x".into())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(ArtifactError::UnsupportedSubject("a.webp".into())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(ArtifactError::ReferenceNotFound("c.png".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(ArtifactError::GenerationFailed("timeout".into())),
            AppError::Internal(_)
        ));
        assert!(matches!(
            AppError::from(ArtifactError::Storage(StorageError::NotFound("p".into()))),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn token_errors_are_unauthorized() {
        assert!(matches!(
            AppError::from(TokenError::Expired),
            AppError::Unauthorized(_)
        ));
    }
}
