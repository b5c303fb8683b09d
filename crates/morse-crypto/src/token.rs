//! # Access Tokens
//!
//! Compact HS256 JWS: `base64url(header).base64url(claims).base64url(mac)`,
//! all without padding. The MAC covers the first two segments as transmitted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Default lifetime of email verification tokens.
pub const DEFAULT_VERIFICATION_TTL_MINUTES: i64 = 24 * 60;

/// What a token may be used for. A token is only accepted for the purpose
/// it was issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Bearer credential issued by login.
    Access,
    /// Single-purpose token mailed in the verification link.
    Verify,
}

/// Claims carried by a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: String,
    pub purpose: TokenPurpose,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Issues and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Zeroizing<Vec<u8>>,
    ttl: Duration,
    verification_ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .field("verification_ttl", &self.verification_ttl)
            .finish()
    }
}

impl TokenSigner {
    /// `ttl` applies to access tokens. Verification tokens default to
    /// [`DEFAULT_VERIFICATION_TTL_MINUTES`].
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: Zeroizing::new(secret.as_ref().to_vec()),
            ttl,
            verification_ttl: Duration::minutes(DEFAULT_VERIFICATION_TTL_MINUTES),
        }
    }

    pub fn with_verification_ttl(mut self, ttl: Duration) -> Self {
        self.verification_ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn verification_ttl(&self) -> Duration {
        self.verification_ttl
    }

    /// Issue an access token.
    pub fn issue(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, TokenPurpose::Access, Utc::now())
    }

    /// Issue an email verification token.
    pub fn issue_verification(&self, user_id: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, TokenPurpose::Verify, Utc::now())
    }

    /// Verify an access token.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify_at(token, TokenPurpose::Access, Utc::now())
    }

    /// Verify an email verification token.
    pub fn verify_verification(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify_at(token, TokenPurpose::Verify, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let ttl = match purpose {
            TokenPurpose::Access => self.ttl,
            TokenPurpose::Verify => self.verification_ttl,
        };
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = AccessClaims {
            user_id: user_id.to_string(),
            purpose,
            exp: (now + ttl).timestamp(),
        };
        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature = self.mac(signing_input.as_bytes())?.finalize().into_bytes();
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify signature, purpose and expiry as if the current time were `now`.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<AccessClaims, TokenError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, claims) = signing_input
            .split_once('.')
            .ok_or(TokenError::Malformed)?;
        if claims.contains('.') {
            return Err(TokenError::Malformed);
        }

        let header: Header = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        self.mac(signing_input.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: AccessClaims = decode_segment(claims)?;
        if claims.user_id.is_empty() {
            return Err(TokenError::InvalidClaims("user_id is empty".into()));
        }
        if claims.purpose != expected {
            return Err(TokenError::WrongPurpose {
                expected,
                found: claims.purpose,
            });
        }
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, TokenError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .map_err(|_| TokenError::InvalidKey)?;
        mac.update(data);
        Ok(mac)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let bytes = serde_json::to_vec(value).map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::InvalidClaims(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", Duration::minutes(120))
    }

    #[test]
    fn issued_token_verifies() {
        let signer = signer();
        let token = signer.issue("user-1").unwrap();
        assert_eq!(token.split('.').count(), 3);
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
    }

    #[test]
    fn expiry_is_now_plus_ttl() {
        let now = Utc::now();
        let token = signer().issue_at("u", TokenPurpose::Access, now).unwrap();
        let claims = signer().verify_at(&token, TokenPurpose::Access, now).unwrap();
        assert_eq!(claims.exp, (now + Duration::minutes(120)).timestamp());
        assert_eq!(claims.purpose, TokenPurpose::Access);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = signer().issue_at("u", TokenPurpose::Access, now).unwrap();
        assert_eq!(
            signer().verify_at(&token, TokenPurpose::Access, now + Duration::minutes(121)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn verification_tokens_use_their_own_ttl() {
        let now = Utc::now();
        let signer = signer().with_verification_ttl(Duration::minutes(30));
        let token = signer.issue_at("u", TokenPurpose::Verify, now).unwrap();
        let claims = signer.verify_at(&token, TokenPurpose::Verify, now).unwrap();
        assert_eq!(claims.exp, (now + Duration::minutes(30)).timestamp());
        assert_eq!(
            signer.verify_at(&token, TokenPurpose::Verify, now + Duration::minutes(31)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn tokens_are_bound_to_their_purpose() {
        let signer = signer();
        let access = signer.issue("u").unwrap();
        let verification = signer.issue_verification("u").unwrap();

        assert_eq!(signer.verify_verification(&verification).unwrap().user_id, "u");
        assert_eq!(
            signer.verify(&verification),
            Err(TokenError::WrongPurpose {
                expected: TokenPurpose::Access,
                found: TokenPurpose::Verify,
            })
        );
        assert_eq!(
            signer.verify_verification(&access),
            Err(TokenError::WrongPurpose {
                expected: TokenPurpose::Verify,
                found: TokenPurpose::Access,
            })
        );
    }

    #[test]
    fn claims_without_purpose_are_rejected() {
        let signer = signer();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"user_id":"u","exp":99999999999}"#);
        let input = format!("{header}.{claims}");
        let mac = signer.mac(input.as_bytes()).unwrap().finalize().into_bytes();
        let token = format!("{input}.{}", URL_SAFE_NO_PAD.encode(mac));
        assert!(matches!(signer.verify(&token), Err(TokenError::InvalidClaims(_))));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = signer().issue("u").unwrap();
        let other = TokenSigner::new("other-secret", Duration::minutes(120));
        assert_eq!(other.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let signer = signer();
        let token = signer.issue("alice").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD
            .encode(br#"{"user_id":"mallory","purpose":"access","exp":99999999999}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(signer.verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn alg_none_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims =
            URL_SAFE_NO_PAD.encode(br#"{"user_id":"u","purpose":"access","exp":99999999999}"#);
        let token = format!("{header}.{claims}.");
        assert_eq!(
            signer().verify(&token),
            Err(TokenError::UnsupportedAlgorithm("none".into()))
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", signer());
        assert!(!debug.contains("test-secret"));
        assert!(debug.contains("REDACTED"));
    }

    proptest! {
        #[test]
        fn garbage_never_verifies(token in "[A-Za-z0-9._-]{0,80}") {
            prop_assert!(signer().verify(&token).is_err());
        }
    }
}
