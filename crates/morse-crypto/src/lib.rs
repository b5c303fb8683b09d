//! # morse-crypto: Credential Primitives
//!
//! - **Password hashing** with PBKDF2-HMAC-SHA256 and a random per-password
//!   salt, stored as a self-describing string so the iteration count can be
//!   raised later without invalidating existing hashes.
//! - **Signed tokens** as compact HS256 JWS (`header.payload.signature`)
//!   carrying the user id, a purpose (login access or email verification)
//!   and an expiry.
//!
//! Both comparisons (password digest, token MAC) run in constant time.

pub mod error;
pub mod password;
pub mod token;

pub use error::{CryptoError, TokenError};
pub use password::{hash_password, verify_password};
pub use token::{AccessClaims, TokenPurpose, TokenSigner, DEFAULT_VERIFICATION_TTL_MINUTES};
