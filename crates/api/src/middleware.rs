//! Request metrics recorded for every matched route.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";

const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Records `http_requests_total` and `http_request_duration_seconds`,
/// labelled by route template, method and status class.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ENDPOINT, MatchedPath::as_str)
        .to_string();
    let method = request.method().to_string();

    let response = next.run(request).await;

    let labels = [
        ("endpoint", endpoint),
        ("method", method),
        ("status_class", status_class(response.status()).to_string()),
    ];
    histogram!(HTTP_REQUEST_DURATION, &labels).record(start.elapsed().as_secs_f64());
    counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);

    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "unknown",
    }
}
