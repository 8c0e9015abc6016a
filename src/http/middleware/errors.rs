//! Server-fault translation.
//!
//! Any 5xx leaving the stack gets the generic body. With debug on, the
//! cause recorded in [`ErrorDetail`] is appended.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::http::error::{ErrorDetail, INTERNAL_MESSAGE};

/// Marker state: whether error causes may be shown to clients.
#[derive(Debug, Clone, Copy)]
pub struct DebugMode(pub bool);

pub async fn error_translation_middleware(
    State(DebugMode(debug)): State<DebugMode>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    let message = match parts.extensions.get::<ErrorDetail>() {
        Some(ErrorDetail(cause)) if debug => format!("{}: {}", INTERNAL_MESSAGE, cause),
        _ => INTERNAL_MESSAGE.to_string(),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    Response::from_parts(parts, Body::from(message))
}
