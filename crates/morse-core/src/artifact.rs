//! # Generated Character Artifacts
//!
//! Character images produced by the try-on service are cached in object
//! storage under a content-derived name. The name is a pure function of the
//! source image and the garment applied to it, so a second request for the
//! same combination finds the cached artifact instead of regenerating it.
//!
//! ## Storage Layout
//!
//! ```text
//! {main_image_root}/character/{sha256(subject[_modifier])}_{m|w}
//! ```
//!
//! The subject has its image extension stripped before hashing. The stored
//! object has no extension.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::storage::{ObjectStore, StorageError, IMAGE_EXTENSIONS};

/// Errors from key derivation and artifact resolution.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("subject identifier must not be empty")]
    EmptySubject,

    #[error("Unsupported file extension for {0}")]
    UnsupportedSubject(String),

    #[error("Invalid gender {0:?}; expected \"man\" or \"woman\"")]
    InvalidGender(String),

    /// The generation collaborator failed. The message is for logs only.
    #[error("image generation failed: {0}")]
    GenerationFailed(String),

    #[error("file {0} not found")]
    ReferenceNotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Lowercase hex SHA-256 naming a generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Hash `subject`, or `subject + "_" + modifier` when a non-empty
    /// modifier is given.
    pub fn derive(subject: &str, modifier: Option<&str>) -> Result<Self, ArtifactError> {
        if subject.is_empty() {
            return Err(ArtifactError::EmptySubject);
        }
        let mut hasher = Sha256::new();
        hasher.update(subject.as_bytes());
        if let Some(modifier) = modifier.filter(|m| !m.is_empty()) {
            hasher.update(b"_");
            hasher.update(modifier.as_bytes());
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Gender of the rendered character. Only the two codes the generator
/// understands are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Man,
    Woman,
}

impl Gender {
    pub fn parse(value: &str) -> Result<Self, ArtifactError> {
        match value {
            "man" => Ok(Self::Man),
            "woman" => Ok(Self::Woman),
            other => Err(ArtifactError::InvalidGender(other.to_string())),
        }
    }

    /// Single-letter suffix used in storage paths.
    pub fn code(self) -> &'static str {
        match self {
            Self::Man => "m",
            Self::Woman => "w",
        }
    }
}

/// Strip the first matching image extension. Matching is case-sensitive.
pub fn strip_extension(subject: &str) -> Option<&str> {
    IMAGE_EXTENSIONS
        .iter()
        .find_map(|ext| subject.strip_suffix(ext))
}

/// Inputs to [`ArtifactResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// Source image name, with extension.
    pub subject: String,
    /// Garment or reference path mixed into the key.
    pub modifier: Option<String>,
    /// Raw gender string as received.
    pub gender: String,
    /// Path that must exist in storage once the artifact is resolved.
    pub reference: Option<String>,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Storage path of the artifact.
    pub path: String,
    /// `true` when an existing artifact was found and nothing was generated.
    pub cache_hit: bool,
}

/// Lookup-or-generate cache over an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    store: Arc<dyn ObjectStore>,
    main_image_root: String,
}

impl ArtifactResolver {
    pub fn new(store: Arc<dyn ObjectStore>, main_image_root: impl Into<String>) -> Self {
        Self {
            store,
            main_image_root: main_image_root.into(),
        }
    }

    /// Storage path an artifact with `key` and `gender` is written to.
    pub fn candidate_path(&self, key: &ArtifactKey, gender: Gender) -> String {
        format!(
            "{}/character/{}_{}",
            self.main_image_root,
            key,
            gender.code()
        )
    }

    /// Return the cached artifact for `request`, generating and storing it
    /// on a miss.
    ///
    /// `generate` is called at most once. Concurrent misses for the same key
    /// each generate and upload; the last upload wins.
    pub async fn resolve<F, Fut, E>(
        &self,
        request: &ResolveRequest,
        generate: F,
    ) -> Result<Resolution, ArtifactError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
        E: fmt::Display,
    {
        let stripped = strip_extension(&request.subject)
            .ok_or_else(|| ArtifactError::UnsupportedSubject(request.subject.clone()))?;
        let gender = Gender::parse(&request.gender)?;
        let key = ArtifactKey::derive(stripped, request.modifier.as_deref())?;
        let candidate = self.candidate_path(&key, gender);

        let resolution = match self.store.find_by_prefix(&candidate).await? {
            Some(path) => {
                tracing::debug!(%path, "character artifact cache hit");
                Resolution {
                    path,
                    cache_hit: true,
                }
            }
            None => {
                tracing::info!(path = %candidate, "character artifact cache miss, generating");
                let bytes = generate()
                    .await
                    .map_err(|e| ArtifactError::GenerationFailed(e.to_string()))?;
                self.store.put(&candidate, bytes).await?;
                Resolution {
                    path: candidate,
                    cache_hit: false,
                }
            }
        };

        if let Some(reference) = request.reference.as_deref() {
            if !self.store.exists(reference).await? {
                return Err(ArtifactError::ReferenceNotFound(reference.to_string()));
            }
        }

        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectStore;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ROOT: &str = "images/main";

    fn request(subject: &str, modifier: Option<&str>, gender: &str) -> ResolveRequest {
        ResolveRequest {
            subject: subject.to_string(),
            modifier: modifier.map(str::to_string),
            gender: gender.to_string(),
            reference: None,
        }
    }

    fn sha256_hex(input: &str) -> String {
        hex::encode(Sha256::digest(input.as_bytes()))
    }

    #[test]
    fn key_is_sha256_of_subject() {
        let key = ArtifactKey::derive("char", None).unwrap();
        assert_eq!(key.as_str(), sha256_hex("char"));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn key_joins_modifier_with_underscore() {
        let key = ArtifactKey::derive("char", Some("tops/shirt.png")).unwrap();
        assert_eq!(key.as_str(), sha256_hex("char_tops/shirt.png"));
    }

    #[test]
    fn empty_modifier_is_treated_as_absent() {
        assert_eq!(
            ArtifactKey::derive("char", Some("")).unwrap(),
            ArtifactKey::derive("char", None).unwrap()
        );
    }

    #[test]
    fn empty_subject_is_rejected() {
        assert!(matches!(
            ArtifactKey::derive("", None),
            Err(ArtifactError::EmptySubject)
        ));
    }

    #[test]
    fn extension_stripping_is_case_sensitive() {
        assert_eq!(strip_extension("char.png"), Some("char"));
        assert_eq!(strip_extension("a/b.jpeg"), Some("a/b"));
        assert_eq!(strip_extension("char.PNG"), None);
        assert_eq!(strip_extension("char.webp"), None);
    }

    #[test]
    fn gender_codes() {
        assert_eq!(Gender::parse("man").unwrap().code(), "m");
        assert_eq!(Gender::parse("woman").unwrap().code(), "w");
        assert!(matches!(
            Gender::parse("Woman"),
            Err(ArtifactError::InvalidGender(_))
        ));
    }

    proptest! {
        #[test]
        fn derive_is_deterministic(subject in "[a-z0-9/_.-]{1,40}", modifier in proptest::option::of("[a-z0-9/_.-]{1,40}")) {
            let a = ArtifactKey::derive(&subject, modifier.as_deref()).unwrap();
            let b = ArtifactKey::derive(&subject, modifier.as_deref()).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn different_modifiers_give_different_keys(subject in "[a-z]{1,20}", m1 in "[a-z]{1,20}", m2 in "[a-z]{1,20}") {
            prop_assume!(m1 != m2);
            let a = ArtifactKey::derive(&subject, Some(&m1)).unwrap();
            let b = ArtifactKey::derive(&subject, Some(&m2)).unwrap();
            prop_assert_ne!(a, b);
        }
    }

    #[tokio::test]
    async fn miss_generates_once_and_writes_candidate_path() {
        let store = MemoryObjectStore::new();
        let resolver = ArtifactResolver::new(Arc::new(store.clone()), ROOT);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let resolution = resolver
            .resolve(&request("char.png", None, "woman"), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(b"rendered".to_vec())
            })
            .await
            .unwrap();

        let expected = format!("{ROOT}/character/{}_w", sha256_hex("char"));
        assert_eq!(resolution.path, expected);
        assert!(!resolution.cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(&expected).await.unwrap(), b"rendered".to_vec());
        assert_eq!(
            store.find_by_prefix(&resolution.path).await.unwrap(),
            Some(expected)
        );
    }

    #[tokio::test]
    async fn second_resolve_is_a_cache_hit() {
        let store = MemoryObjectStore::new();
        let resolver = ArtifactResolver::new(Arc::new(store), ROOT);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let req = request("char.jpg", Some("tops/shirt.png"), "man");
        let generate = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(vec![1, 2, 3])
        };

        let first = resolver.resolve(&req, generate).await.unwrap();
        let second = resolver.resolve(&req, generate).await.unwrap();

        assert_eq!(first.path, second.path);
        assert!(second.cache_hit);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn prefix_hit_returns_the_stored_name() {
        let store = MemoryObjectStore::new();
        let stored = format!("{ROOT}/character/{}_m.png", sha256_hex("char"));
        store.insert(&stored, vec![0]);
        let resolver = ArtifactResolver::new(Arc::new(store), ROOT);

        let resolution = resolver
            .resolve(&request("char.png", None, "man"), || async {
                Err::<Vec<u8>, _>("must not be called")
            })
            .await
            .unwrap();

        assert_eq!(resolution.path, stored);
        assert!(resolution.cache_hit);
    }

    #[tokio::test]
    async fn validation_happens_before_generation() {
        let resolver = ArtifactResolver::new(Arc::new(MemoryObjectStore::new()), ROOT);
        let never = || async { Err::<Vec<u8>, _>("must not be called") };

        let err = resolver
            .resolve(&request("char.webp", None, "woman"), never)
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::UnsupportedSubject(_)));

        let err = resolver
            .resolve(&request("char.png", None, "other"), never)
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidGender(_)));
    }

    #[tokio::test]
    async fn generation_failure_writes_nothing() {
        let store = MemoryObjectStore::new();
        let resolver = ArtifactResolver::new(Arc::new(store.clone()), ROOT);

        let err = resolver
            .resolve(&request("char.png", None, "woman"), || async {
                Err::<Vec<u8>, _>("upstream timed out")
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ArtifactError::GenerationFailed(m) if m == "upstream timed out"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_reference_is_reported_after_resolution() {
        let store = MemoryObjectStore::new();
        let resolver = ArtifactResolver::new(Arc::new(store.clone()), ROOT);
        let mut req = request("char.png", Some("tops/shirt.png"), "woman");
        req.reference = Some("tops/shirt.png".into());

        let err = resolver
            .resolve(&req, || async { Ok::<_, String>(vec![9]) })
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::ReferenceNotFound(p) if p == "tops/shirt.png"));
        assert_eq!(store.len(), 1);

        store.insert("tops/shirt.png", vec![0]);
        let resolution = resolver
            .resolve(&req, || async { Ok::<_, String>(vec![9]) })
            .await
            .unwrap();
        assert!(resolution.cache_hit);
    }
}
