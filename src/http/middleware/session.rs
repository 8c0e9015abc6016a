//! Session middlewares.
//!
//! Both modes run the same [`SessionCodec::inspect`]; only what happens
//! after the token has been classified differs.
//!
//! | state   | best-effort          | strict |
//! |---------|----------------------|--------|
//! | NoToken | continue, anonymous  | 401    |
//! | Invalid | continue, anonymous  | 400    |
//! | Valid   | continue with claim  | continue with claim |

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::error::ApiError;
use crate::observability::metrics;
use crate::session::{cookie, SessionCodec, TokenState};

fn classify(codec: &SessionCodec, request: &Request<Body>) -> TokenState {
    let token = cookie::token_from_headers(request.headers());
    let state = codec.inspect(token.as_deref());
    metrics::record_session(state.label());
    state
}

/// Attach the claim when a valid token is present; never reject.
pub async fn session_middleware(
    State(codec): State<Arc<SessionCodec>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match classify(&codec, &request) {
        TokenState::Valid(session) => {
            request.extensions_mut().insert(session);
        }
        TokenState::Invalid(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session token");
        }
        TokenState::NoToken => {}
    }
    next.run(request).await
}

/// Only requests carrying a valid token get through.
pub async fn require_session(
    State(codec): State<Arc<SessionCodec>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match classify(&codec, &request) {
        TokenState::Valid(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        TokenState::NoToken => ApiError::unauthorized("unauthorized").into_response(),
        TokenState::Invalid(e) => ApiError::bad_request(e.to_string()).into_response(),
    }
}
