//! # Account Routes
//!
//! Signup with email verification, password login issuing bearer tokens,
//! and the current-user lookup.

use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::extractors::{extract_form, extract_query, extract_validated_json, Validate};
use crate::mailer::EmailMessage;
use crate::state::AppState;
use crate::users::{self, PublicUser, UserRecord};
use crate::API_PREFIX;

pub const TAG: &str = "Authentication";

const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/verify-email", get(verify_email))
        .route("/me", get(me))
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_company: bool,
    #[serde(default)]
    pub promo: bool,
}

impl Validate for SignupRequest {
    fn validate(&self) -> Result<(), String> {
        let well_formed = self
            .email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed || self.email.chars().any(char::is_whitespace) {
            return Err(format!("invalid email address: {}", self.email));
        }
        if self.password.is_empty() {
            return Err("password must not be empty".into());
        }
        Ok(())
    }
}

/// OAuth2-style password form. `username` carries the email.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /signup
#[utoipa::path(
    post,
    path = "/api/v2/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = PublicUser),
        (status = 400, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid email or password", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let req = extract_validated_json(body)?;
    let documents = state.documents.as_ref();

    if users::find_by_email(documents, &req.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password = req.password;
    let hashed = tokio::task::spawn_blocking(move || morse_crypto::hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))??;

    let user = UserRecord {
        id: String::new(),
        email: req.email,
        hashed_password: Some(hashed),
        full_name: req.full_name,
        is_company: req.is_company,
        company_id: req.is_company.then(|| uuid::Uuid::new_v4().to_string()),
        promo: req.promo,
        is_active: false,
        is_verified: false,
        date_joined: Some(Utc::now()),
    };
    let user = users::insert(documents, user).await?;
    tracing::info!(user_id = %user.id, "user registered");

    send_verification(&state, &user).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Email a verification link. Delivery failures are logged, not returned.
async fn send_verification(state: &AppState, user: &UserRecord) -> Result<(), AppError> {
    let token = state.tokens.issue_verification(&user.id)?;
    let link = format!(
        "{}{}/verify-email?token={}",
        state.config.domain.trim_end_matches('/'),
        API_PREFIX,
        token
    );
    let message = EmailMessage {
        to: user.email.clone(),
        subject: "Email Verification".into(),
        body: format!("Please verify your email by clicking on the following link: {link}"),
    };
    if let Err(error) = state.mailer.send(message).await {
        tracing::warn!(user_id = %user.id, %error, "verification email not sent");
    }
    Ok(())
}

/// POST /login
#[utoipa::path(
    post,
    path = "/api/v2/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Bearer token issued", body = TokenResponse),
        (status = 400, description = "Bad credentials or unverified email", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let form = extract_form(form)?;

    let user = users::find_by_email(state.documents.as_ref(), &form.username)
        .await?
        .ok_or_else(|| AppError::BadRequest(INCORRECT_CREDENTIALS.into()))?;

    let hashed = user
        .hashed_password
        .clone()
        .ok_or_else(|| AppError::BadRequest("Password not set for this user".into()))?;

    let password = form.password;
    let matches = tokio::task::spawn_blocking(move || morse_crypto::verify_password(&password, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))??;
    if !matches {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(AppError::BadRequest(INCORRECT_CREDENTIALS.into()));
    }

    if !user.is_verified {
        return Err(AppError::BadRequest("Email not verified".into()));
    }

    let access_token = state.tokens.issue(&user.id)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    }))
}

/// GET /verify-email?token=
#[utoipa::path(
    get,
    path = "/api/v2/verify-email",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 401, description = "Invalid or expired token", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn verify_email(
    State(state): State<AppState>,
    query: Result<Query<VerifyEmailQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let VerifyEmailQuery { token } = extract_query(query)?;
    let claims = state.tokens.verify_verification(&token)?;

    if !users::mark_verified(state.documents.as_ref(), &claims.user_id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %claims.user_id, "email verified");

    Ok(Json(MessageResponse {
        message: "Email verified successfully".into(),
    }))
}

/// GET /me
#[utoipa::path(
    get,
    path = "/api/v2/me",
    responses(
        (status = 200, description = "The authenticated user", body = PublicUser),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = TAG
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}
