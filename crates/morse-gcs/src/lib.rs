//! # morse-gcs: Google Cloud Storage Client
//!
//! Typed access to one GCS bucket over the JSON API. [`GcsClient`]
//! implements [`morse_core::ObjectStore`], which is the only way the API
//! crate touches the bucket.
//!
//! Credentials come from a [`TokenProvider`]: Application Default
//! Credentials in deployment, a fixed token against emulators. A request
//! rejected with 401 is retried once with fresh credentials; any other
//! failure is reported as is.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;

pub use client::{GcsClient, ObjectMetadata};
pub use config::{ConfigError, CredentialSource, GcsConfig};
pub use credentials::{GoogleCredentials, StaticToken, TokenProvider};
pub use error::GcsError;
