//! # Request Metrics
//!
//! Records HTTP request counts, error counts, and latency through the
//! `metrics` facade. A Prometheus recorder installed in `main` renders them
//! at `/metrics`; without a recorder the calls are no-ops.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "morse_http_requests_total";
pub const HTTP_ERRORS_TOTAL: &str = "morse_http_errors_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "morse_http_request_duration_seconds";

/// Label for the request path. Uses the matched route template so path
/// parameters do not explode label cardinality.
fn path_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Axum middleware recording one counter increment and one histogram
/// sample per request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = path_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let labels = [
        ("method", method.clone()),
        ("path", path.clone()),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!(HTTP_REQUESTS_TOTAL, &labels[..]).increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(HTTP_ERRORS_TOTAL, &labels[..]).increment(1);
    }
    metrics::histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path)
        .record(start.elapsed().as_secs_f64());

    response
}

/// GET /metrics: Prometheus text exposition.
pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
