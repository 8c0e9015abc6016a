//! Per-request log line and request metrics.

use std::time::Instant;

use axum::{
    body::{Body, HttpBody},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::error::ErrorDetail;
use crate::observability::metrics;

pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_owned();

    let response = next.run(request).await;

    let status = response.status();
    let size = response.body().size_hint().exact().unwrap_or(0);
    let duration = start.elapsed();
    let detail = response.extensions().get::<ErrorDetail>().map(|d| d.0.as_str());

    match detail {
        Some(error) if status.is_server_error() => tracing::error!(
            request_id = %request_id,
            status = status.as_u16(),
            size,
            duration = ?duration,
            error,
            "{} {}",
            method,
            path
        ),
        Some(error) => tracing::debug!(
            request_id = %request_id,
            status = status.as_u16(),
            size,
            duration = ?duration,
            error,
            "{} {}",
            method,
            path
        ),
        None => tracing::debug!(
            request_id = %request_id,
            status = status.as_u16(),
            size,
            duration = ?duration,
            "{} {}",
            method,
            path
        ),
    }

    metrics::record_request(method.as_str(), status.as_u16(), start);
    response
}
