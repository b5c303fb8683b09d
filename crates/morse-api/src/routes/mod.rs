//! # API Route Groups
//!
//! Every endpoint module exposes a `router()` and is listed once in
//! [`ROUTE_GROUPS`] together with its documentation tag. [`api_router`]
//! merges the groups; [`crate::app`] nests the result under
//! [`crate::API_PREFIX`].

pub mod auth;
pub mod google_cloud;
pub mod request;
pub mod try_on;

use axum::Router;

use crate::state::AppState;

/// A named set of endpoints registered with the API.
#[derive(Debug, Clone, Copy)]
pub struct RouteGroup {
    /// Module name, used in logs.
    pub name: &'static str,
    /// OpenAPI tag shared by the group's endpoints.
    pub tag: &'static str,
    pub router: fn() -> Router<AppState>,
}

/// All route groups served under the API prefix.
pub static ROUTE_GROUPS: &[RouteGroup] = &[
    RouteGroup {
        name: "auth",
        tag: auth::TAG,
        router: auth::router,
    },
    RouteGroup {
        name: "google_cloud",
        tag: google_cloud::TAG,
        router: google_cloud::router,
    },
    RouteGroup {
        name: "request",
        tag: request::TAG,
        router: request::router,
    },
    RouteGroup {
        name: "tryOn",
        tag: try_on::TAG,
        router: try_on::router,
    },
];

/// Merge every registered group into one router.
pub fn api_router() -> Router<AppState> {
    ROUTE_GROUPS.iter().fold(Router::new(), |api, group| {
        tracing::info!(group = group.name, tag = group.tag, "registered route group");
        api.merge((group.router)())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn group_names_are_unique() {
        let names: HashSet<_> = ROUTE_GROUPS.iter().map(|g| g.name).collect();
        assert_eq!(names.len(), ROUTE_GROUPS.len());
    }

    #[test]
    fn groups_build_without_route_conflicts() {
        // Overlapping routes panic on merge.
        let _ = api_router();
    }
}
