//! # morse-api: Axum API Service for Morseverse
//!
//! HTTP surface over the image bucket and the user document store.
//!
//! ## API Surface
//!
//! | Prefix | Module | Domain |
//! |--------|--------|--------|
//! | `/api/v2/get-cloth`, `/get-image`, `/recommendation`, `/character*`, `/get-coordinates` | [`routes::google_cloud`] | Bucket images and try-on characters |
//! | `/api/v2/*-cookie` | [`routes::request`] | Browser cookies |
//! | `/api/v2/signup`, `/login`, `/verify-email`, `/me` | [`routes::auth`] | Accounts |
//! | `/api/v2/try-on-ai-call` | [`routes::try_on`] | Try-on parameters |
//!
//! Route groups are listed in [`routes::ROUTE_GROUPS`].
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! Health probes (`/health/*`), `/metrics`, and `/openapi.json` sit outside
//! the API prefix.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod generation;
pub mod mailer;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod users;

use axum::http::HeaderValue;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::AppError;
pub use state::AppState;

/// Path prefix of every API route group.
pub const API_PREFIX: &str = "/api/v2";

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let api = Router::new().nest(API_PREFIX, routes::api_router());

    let unprefixed = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::prometheus_metrics))
        .merge(openapi::router());

    Router::new()
        .merge(api)
        .merge(unprefixed)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the configured origins, with credentials. Methods and headers
/// mirror the preflight request.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Collaborators are connected before the router is built,
/// so a serving process is ready.
async fn readiness() -> &'static str {
    "ready"
}
