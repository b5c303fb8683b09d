//! # Bearer Authentication
//!
//! Access tokens are issued by `/login` and carried as
//! `Authorization: Bearer <token>`. Handlers that need the caller take a
//! [`CurrentUser`] argument; the extractor verifies the token signature,
//! purpose and expiry, then loads the user document. Email verification
//! tokens are not accepted here.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;
use crate::users::{self, UserRecord};

const CREDENTIALS_REJECTED: &str = "Could not validate credentials";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

/// Pull the token out of an `Authorization` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let claims = state.tokens.verify(token)?;

        match users::find_by_id(state.documents.as_ref(), &claims.user_id).await? {
            Some(user) => Ok(Self(user)),
            None => {
                tracing::debug!(user_id = %claims.user_id, "token refers to unknown user");
                Err(AppError::Unauthorized(CREDENTIALS_REJECTED.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
