//! Request body ceiling.
//!
//! Bodies with a `Content-Length` over the ceiling are rejected with 413
//! before any handler runs; streamed bodies fail with 413 as soon as they
//! cross it.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Cap every request body at `max_bytes`.
pub fn limit_body<S>(router: Router<S>, max_bytes: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_bytes))
}
