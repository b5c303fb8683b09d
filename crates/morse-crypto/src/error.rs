//! # Credential Error Types

use thiserror::Error;

use crate::token::TokenPurpose;

/// Errors from password hashing and verification.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// A stored password hash could not be parsed.
    #[error("malformed password hash: {0}")]
    MalformedHash(String),

    /// The operating system random source failed.
    #[error("random source unavailable: {0}")]
    Rng(String),
}

/// Errors from token verification.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not a compact JWS")]
    Malformed,

    #[error("unsupported token algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("signing key rejected")]
    InvalidKey,

    #[error("token claims invalid: {0}")]
    InvalidClaims(String),

    #[error("token issued for {found:?}, expected {expected:?}")]
    WrongPurpose {
        expected: TokenPurpose,
        found: TokenPurpose,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_hash_display() {
        let err = CryptoError::MalformedHash("missing salt".to_string());
        assert!(format!("{err}").contains("missing salt"));
    }

    #[test]
    fn unsupported_algorithm_display() {
        let msg = TokenError::UnsupportedAlgorithm("none".into()).to_string();
        assert!(msg.contains("none"));
    }
}
