//! # Try-On Routes

use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_validated_json;
use crate::generation::TryOnRequest;
use crate::state::AppState;

pub const TAG: &str = "fashion.ai";

pub fn router() -> Router<AppState> {
    Router::new().route("/try-on-ai-call", post(try_on))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TryOnResponse {
    pub status: String,
    pub message: String,
    pub parameters_used: TryOnRequest,
}

/// POST /try-on-ai-call: validate try-on parameters and echo them back
/// with defaults filled in.
#[utoipa::path(
    post,
    path = "/api/v2/try-on-ai-call",
    request_body = TryOnRequest,
    responses(
        (status = 200, description = "Parameters accepted", body = TryOnResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 422, description = "Parameters out of range", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn try_on(
    body: Result<Json<TryOnRequest>, JsonRejection>,
) -> Result<Json<TryOnResponse>, AppError> {
    let parameters = extract_validated_json(body)?;
    Ok(Json(TryOnResponse {
        status: "success".into(),
        message: "Processing complete.".into(),
        parameters_used: parameters,
    }))
}
