//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented handler into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme used by `/me`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token issued by POST /api/v2/login."))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Morseverse",
        version = "2.0.0",
        description = "APIs for the Morseverse website: bucket images, clothing catalog and recommendations, project coordinates, cached try-on characters, cookies, and user accounts."
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server"),
    ),
    paths(
        // ── Google Cloud ─────────────────────────────────────────────────
        crate::routes::google_cloud::get_cloth,
        crate::routes::google_cloud::get_image,
        crate::routes::google_cloud::get_recommendation,
        crate::routes::google_cloud::get_character_with_cloth,
        crate::routes::google_cloud::get_character,
        crate::routes::google_cloud::get_coordinates,
        // ── Config ───────────────────────────────────────────────────────
        crate::routes::request::set_cookie,
        crate::routes::request::get_cookie,
        crate::routes::request::delete_cookie,
        // ── Authentication ───────────────────────────────────────────────
        crate::routes::auth::signup,
        crate::routes::auth::login,
        crate::routes::auth::verify_email,
        crate::routes::auth::me,
        // ── fashion.ai ───────────────────────────────────────────────────
        crate::routes::try_on::try_on,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::users::PublicUser,
        crate::generation::TryOnRequest,
        crate::generation::GarmentPhotoType,
        crate::routes::google_cloud::ImageBase64Response,
        crate::routes::google_cloud::RecommendationList,
        crate::routes::google_cloud::CharacterResponse,
        crate::routes::request::CookieRequest,
        crate::routes::request::CookieResponse,
        crate::routes::auth::SignupRequest,
        crate::routes::auth::LoginForm,
        crate::routes::auth::TokenResponse,
        crate::routes::auth::MessageResponse,
        crate::routes::try_on::TryOnResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = crate::routes::google_cloud::TAG, description = "Bucket images, catalog, and try-on characters"),
        (name = crate::routes::request::TAG, description = "Browser cookies"),
        (name = crate::routes::auth::TAG, description = "Signup, login, and email verification"),
        (name = crate::routes::try_on::TAG, description = "Try-on parameters"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_carries_service_identity() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "Morseverse");
        assert_eq!(doc.info.version, "2.0.0");
    }

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v2/get-cloth/{category}",
            "/api/v2/character/{name}",
            "/api/v2/set-cookie",
            "/api/v2/login",
            "/api/v2/me",
            "/api/v2/try-on-ai-call",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn operation_tags_match_route_groups() {
        let doc = ApiDoc::openapi();
        let group_tags: Vec<&str> = crate::routes::ROUTE_GROUPS.iter().map(|g| g.tag).collect();

        let declared: Vec<String> = doc
            .tags
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect();
        for tag in &group_tags {
            assert!(declared.iter().any(|d| d == tag), "undeclared tag {tag}");
        }

        for (path, item) in &doc.paths.paths {
            for op in [&item.get, &item.post].into_iter().flatten() {
                let tags = op.tags.clone().unwrap_or_default();
                assert!(!tags.is_empty(), "{path} has no tag");
                for tag in tags {
                    assert!(group_tags.contains(&tag.as_str()), "{path} tagged {tag}");
                }
            }
        }
    }
}
