//! # Cookie Routes
//!
//! Set, read, and expire browser cookies by name.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::state::AppState;

pub const TAG: &str = "Config";

/// Lifetime of cookies set through `/set-cookie`.
pub const COOKIE_MAX_AGE_SECS: i64 = 3600;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/set-cookie", post(set_cookie))
        .route("/get-cookie", get(get_cookie))
        .route("/delete-cookie", get(delete_cookie))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CookieRequest {
    pub key: String,
    pub value: String,
}

impl Validate for CookieRequest {
    fn validate(&self) -> Result<(), String> {
        let valid_name = !self.key.is_empty()
            && self
                .key
                .chars()
                .all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c));
        if !valid_name {
            return Err(format!("invalid cookie name: {:?}", self.key));
        }
        if self.value.chars().any(|c| c == ';' || c.is_control()) {
            return Err("cookie value must not contain ';' or control characters".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CookieKeyQuery {
    /// Name of the cookie.
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CookieResponse {
    pub message: String,
    pub cookie_key: String,
    pub cookie_value: Option<String>,
}

/// POST /set-cookie
#[utoipa::path(
    post,
    path = "/api/v2/set-cookie",
    request_body = CookieRequest,
    responses(
        (status = 200, description = "Cookie set", body = CookieResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid cookie name or value", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn set_cookie(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<CookieRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<CookieResponse>), AppError> {
    let req = extract_validated_json(body)?;

    let cookie = Cookie::build((req.key.clone(), req.value.clone()))
        .http_only(true)
        .max_age(cookie::time::Duration::seconds(COOKIE_MAX_AGE_SECS))
        .secure(state.config.production)
        .path("/");

    Ok((
        jar.add(cookie),
        Json(CookieResponse {
            message: "Cookie has been set".into(),
            cookie_key: req.key,
            cookie_value: Some(req.value),
        }),
    ))
}

/// GET /get-cookie?key=
#[utoipa::path(
    get,
    path = "/api/v2/get-cookie",
    params(CookieKeyQuery),
    responses(
        (status = 200, description = "Cookie value", body = CookieResponse),
        (status = 404, description = "Cookie not present", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn get_cookie(
    jar: CookieJar,
    query: Result<Query<CookieKeyQuery>, QueryRejection>,
) -> Result<Json<CookieResponse>, AppError> {
    let CookieKeyQuery { key } = extract_query(query)?;
    let value = jar
        .get(&key)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::NotFound(format!("Cookie {key} not found")))?;

    Ok(Json(CookieResponse {
        message: "Cookie retrieved successfully".into(),
        cookie_key: key,
        cookie_value: Some(value),
    }))
}

/// GET /delete-cookie?key=
#[utoipa::path(
    get,
    path = "/api/v2/delete-cookie",
    params(CookieKeyQuery),
    responses(
        (status = 200, description = "Cookie expired", body = CookieResponse),
    ),
    tag = TAG
)]
pub async fn delete_cookie(
    jar: CookieJar,
    query: Result<Query<CookieKeyQuery>, QueryRejection>,
) -> Result<(CookieJar, Json<CookieResponse>), AppError> {
    let CookieKeyQuery { key } = extract_query(query)?;
    // Emit the expiry even when the request did not carry the cookie.
    let mut expired = Cookie::build((key.clone(), "")).path("/").build();
    expired.make_removal();
    let jar = jar.add(expired);

    Ok((
        jar,
        Json(CookieResponse {
            message: "Cookie has been deleted".into(),
            cookie_key: key,
            cookie_value: None,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(key: &str, value: &str) -> CookieRequest {
        CookieRequest {
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn cookie_names_follow_token_rules() {
        assert!(req("session", "abc").validate().is_ok());
        assert!(req("", "abc").validate().is_err());
        assert!(req("a b", "abc").validate().is_err());
        assert!(req("a=b", "abc").validate().is_err());
    }

    #[test]
    fn cookie_values_reject_separators() {
        assert!(req("k", "a;b").validate().is_err());
        assert!(req("k", "a\nb").validate().is_err());
        assert!(req("k", "").validate().is_ok());
    }
}
