//! # Password Hashing
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt b64>$<digest b64>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::CryptoError;

const SCHEME: &str = "pbkdf2-sha256";
pub const DEFAULT_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    hash_password_with_iterations(password, DEFAULT_ITERATIONS)
}

pub fn hash_password_with_iterations(password: &str, iterations: u32) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::Rng(e.to_string()))?;

    let mut digest = Zeroizing::new([0u8; DIGEST_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut digest[..]);

    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(&digest[..])
    ))
}

/// Check `password` against an encoded hash.
///
/// Returns `Ok(false)` on mismatch and `Err` only when `encoded` is not a
/// hash this module produced.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, CryptoError> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash("expected four `$`-separated fields".into()));
    };

    if scheme != SCHEME {
        return Err(CryptoError::MalformedHash(format!("unknown scheme {scheme}")));
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| CryptoError::MalformedHash(format!("bad iteration count {iterations}")))?;
    if iterations == 0 {
        return Err(CryptoError::MalformedHash("iteration count is zero".into()));
    }
    let salt = STANDARD
        .decode(salt)
        .map_err(|e| CryptoError::MalformedHash(format!("salt: {e}")))?;
    let expected = STANDARD
        .decode(expected)
        .map_err(|e| CryptoError::MalformedHash(format!("digest: {e}")))?;
    if expected.is_empty() {
        return Err(CryptoError::MalformedHash("empty digest".into()));
    }

    let mut actual = Zeroizing::new(vec![0u8; expected.len()]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut actual[..]);
    Ok(bool::from(actual[..].ct_eq(&expected[..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low iteration count keeps the suite fast; the format is identical.
    fn quick_hash(password: &str) -> String {
        hash_password_with_iterations(password, 1_000).unwrap()
    }

    #[test]
    fn correct_password_verifies() {
        let encoded = quick_hash("hunter2");
        assert!(verify_password("hunter2", &encoded).unwrap());
        assert!(!verify_password("hunter3", &encoded).unwrap());
    }

    #[test]
    fn default_hash_uses_default_iterations() {
        let encoded = hash_password("pw").unwrap();
        assert!(encoded.starts_with("pbkdf2-sha256$100000$"));
        assert!(verify_password("pw", &encoded).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(quick_hash("same"), quick_hash("same"));
    }

    #[test]
    fn malformed_hashes_are_errors() {
        for bad in [
            "",
            "plaintext",
            "bcrypt$10$c2FsdA==$ZGlnZXN0",
            "pbkdf2-sha256$abc$c2FsdA==$ZGlnZXN0",
            "pbkdf2-sha256$0$c2FsdA==$ZGlnZXN0",
            "pbkdf2-sha256$10$!!$ZGlnZXN0",
            "pbkdf2-sha256$10$c2FsdA==$ZGlnZXN0$extra",
        ] {
            assert!(
                matches!(verify_password("pw", bad), Err(CryptoError::MalformedHash(_))),
                "accepted {bad:?}"
            );
        }
    }
}
