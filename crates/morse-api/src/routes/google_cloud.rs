//! # Bucket Routes
//!
//! Images, catalog listings, recommendations, project coordinates, and the
//! cached try-on character images. All reads go through the configured
//! [`morse_core::ObjectStore`].

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use morse_core::{
    assemble, list_catalog, parse_project_list, select_recommendations, ArtifactError, Catalog,
    Category, Project, ResolveRequest,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_query};
use crate::generation::{GenerationInput, TryOnRequest};
use crate::state::AppState;

pub const TAG: &str = "Google Cloud";

const NO_GENERATOR: &str = "Image generation service is not configured";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-cloth/{category}", get(get_cloth))
        .route("/get-image/{*image_path}", get(get_image))
        .route("/recommendation/{*image_path}", get(get_recommendation))
        .route(
            "/character_with_cloth/{*main_character}",
            get(get_character_with_cloth),
        )
        .route("/character/{*name}", get(get_character))
        .route("/get-coordinates/{project_name}", get(get_coordinates))
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ImageBase64Response {
    pub image_base64: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendationList {
    /// Category name to the recommended storage paths.
    pub image_paths: BTreeMap<String, Vec<String>>,
}

impl From<Catalog> for RecommendationList {
    fn from(catalog: Catalog) -> Self {
        Self {
            image_paths: catalog
                .into_iter()
                .map(|(category, items)| (category.to_string(), items))
                .collect(),
        }
    }
}

/// Query for `/character_with_cloth`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClothQuery {
    /// `man` or `woman`.
    pub gender: String,
    /// Garment to dress the character in.
    #[serde(default)]
    pub cloth_path: Option<String>,
}

/// Query for `/character`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CharacterQuery {
    /// `man` or `woman`.
    pub gender: String,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CharacterResponse {
    /// Storage path of the character image.
    pub path: String,
    /// `false` when the image was generated by this request.
    pub cache_hit: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /get-cloth/{category}: image paths in one catalog category.
#[utoipa::path(
    get,
    path = "/api/v2/get-cloth/{category}",
    params(("category" = String, Path, description = "tops, bottoms or overwears")),
    responses(
        (status = 200, description = "Image paths in storage order", body = Vec<String>),
        (status = 400, description = "Unknown category", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn get_cloth(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let category: Category = category
        .parse()
        .map_err(|e: morse_core::CatalogError| AppError::BadRequest(e.to_string()))?;

    let mut catalog = list_catalog(
        state.objects.as_ref(),
        &state.config.recommendation_prefix,
        Some(&[category][..]),
    )
    .await;

    Ok(Json(catalog.remove(&category).unwrap_or_default()))
}

/// GET /get-image/{path}: object bytes as base64.
#[utoipa::path(
    get,
    path = "/api/v2/get-image/{image_path}",
    params(("image_path" = String, Path, description = "Object path inside the bucket")),
    responses(
        (status = 200, description = "Base64-encoded image", body = ImageBase64Response),
        (status = 404, description = "No such object", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(image_path): Path<String>,
) -> Result<Json<ImageBase64Response>, AppError> {
    let bytes = state.objects.get(&image_path).await?;
    Ok(Json(ImageBase64Response {
        image_base64: STANDARD.encode(bytes),
    }))
}

/// GET /recommendation/{path}: the first two items of each default category.
///
/// The path segment is accepted for client compatibility and does not
/// influence the selection.
#[utoipa::path(
    get,
    path = "/api/v2/recommendation/{image_path}",
    params(("image_path" = String, Path, description = "Image the recommendation is for")),
    responses(
        (status = 200, description = "Recommended paths per category", body = RecommendationList),
        (status = 400, description = "A category has fewer than two items", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn get_recommendation(
    State(state): State<AppState>,
    Path(image_path): Path<String>,
) -> Result<Json<RecommendationList>, AppError> {
    tracing::debug!(%image_path, "recommendation requested");
    let catalog = list_catalog(
        state.objects.as_ref(),
        &state.config.recommendation_prefix,
        None,
    )
    .await;
    let selected = select_recommendations(&catalog)?;
    Ok(Json(selected.into()))
}

/// GET /character_with_cloth/{path}: cached try-on image for a character
/// wearing `cloth_path`.
#[utoipa::path(
    get,
    path = "/api/v2/character_with_cloth/{main_character}",
    params(
        ("main_character" = String, Path, description = "Character image path"),
        ClothQuery,
        TryOnRequest,
    ),
    responses(
        (status = 200, description = "Character image location", body = CharacterResponse),
        (status = 400, description = "Unsupported extension or gender", body = crate::error::ErrorBody),
        (status = 404, description = "Garment does not exist", body = crate::error::ErrorBody),
        (status = 422, description = "Try-on parameters out of range", body = crate::error::ErrorBody),
        (status = 503, description = "Generation service not configured", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn get_character_with_cloth(
    State(state): State<AppState>,
    Path(main_character): Path<String>,
    query: Result<Query<ClothQuery>, QueryRejection>,
    params: Result<Query<TryOnRequest>, QueryRejection>,
) -> Result<Json<CharacterResponse>, AppError> {
    let query = extract_query(query)?;
    let params = extract_validated_query(params)?;
    resolve_character(&state, main_character, query.gender, query.cloth_path, params).await
}

/// GET /character/{name}: same cache as `/character_with_cloth`, keyed by
/// `image_path`.
#[utoipa::path(
    get,
    path = "/api/v2/character/{name}",
    params(
        ("name" = String, Path, description = "Character image path"),
        CharacterQuery,
        TryOnRequest,
    ),
    responses(
        (status = 200, description = "Character image location", body = CharacterResponse),
        (status = 400, description = "Unsupported extension or gender", body = crate::error::ErrorBody),
        (status = 404, description = "Referenced image does not exist", body = crate::error::ErrorBody),
        (status = 422, description = "Try-on parameters out of range", body = crate::error::ErrorBody),
        (status = 503, description = "Generation service not configured", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn get_character(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: Result<Query<CharacterQuery>, QueryRejection>,
    params: Result<Query<TryOnRequest>, QueryRejection>,
) -> Result<Json<CharacterResponse>, AppError> {
    let query = extract_query(query)?;
    let params = extract_validated_query(params)?;
    resolve_character(&state, name, query.gender, query.image_path, params).await
}

async fn resolve_character(
    state: &AppState,
    subject: String,
    gender: String,
    modifier: Option<String>,
    parameters: TryOnRequest,
) -> Result<Json<CharacterResponse>, AppError> {
    let modifier = modifier.filter(|m| !m.is_empty());
    let request = ResolveRequest {
        subject: subject.clone(),
        modifier: modifier.clone(),
        gender: gender.clone(),
        reference: modifier.clone(),
    };
    let input = GenerationInput {
        character: subject,
        garment: modifier,
        gender,
        parameters,
    };
    let generator = state.generator.clone();

    let resolution = state
        .resolver()
        .resolve(&request, || async move {
            match generator {
                Some(generator) => generator.generate(&input).await.map_err(|e| e.to_string()),
                None => Err(NO_GENERATOR.to_string()),
            }
        })
        .await;

    match resolution {
        Ok(resolution) => Ok(Json(CharacterResponse {
            path: resolution.path,
            cache_hit: resolution.cache_hit,
        })),
        Err(ArtifactError::GenerationFailed(_)) if state.generator.is_none() => {
            Err(AppError::ServiceUnavailable(NO_GENERATOR.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// GET /get-coordinates/{projectName}: one project from the coordinates
/// document with formatted image references.
#[utoipa::path(
    get,
    path = "/api/v2/get-coordinates/{project_name}",
    params(("project_name" = String, Path, description = "Project name, case-insensitive")),
    responses(
        (status = 200, description = "Project images and coordinates"),
        (status = 404, description = "Project not found", body = crate::error::ErrorBody),
    ),
    tag = TAG
)]
pub async fn get_coordinates(
    State(state): State<AppState>,
    Path(project_name): Path<String>,
) -> Result<Json<Project>, AppError> {
    let text = state.objects.get_text(&state.config.coordinates_path).await?;
    let projects = parse_project_list(&text)?;
    let project = assemble(&projects, &project_name, state.url_formatter.as_ref())?;
    Ok(Json(project))
}
