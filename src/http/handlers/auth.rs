//! `/api/auth/*`: registration, login and logout.
//!
//! Rate limited and behind the best-effort session middleware, so login can
//! tell whether the caller is already signed in. Preflight is routed through
//! the same stack and passes the limiter untouched.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use validator::Validate;

use super::{preflight, printable_ascii, Mount};
use crate::container::Container;
use crate::http::error::ApiError;
use crate::http::extract::{MaybeSession, Transport, ValidatedJson};
use crate::http::middleware::session_middleware;
use crate::security::{rate_limit_middleware, RateLimiter};
use crate::services::{AccountError, AccountService};
use crate::session::{cookie, Session, SessionCodec};

pub struct AuthHandler {
    codec: Arc<SessionCodec>,
    limiter: Arc<RateLimiter>,
    accounts: Arc<AccountService>,
}

pub fn provider(c: &Container) -> Box<dyn Mount> {
    Box::new(AuthHandler {
        codec: c.lookup("session"),
        limiter: c.lookup("ratelimit"),
        accounts: c.lookup("service/account"),
    })
}

impl Mount for AuthHandler {
    fn mount(self: Box<Self>, router: Router) -> Router {
        let codec = self.codec.clone();
        let limiter = self.limiter.clone();
        let routes = Router::new()
            .route("/api/auth/register", post(register).options(preflight))
            .route("/api/auth/login", post(login).options(preflight))
            .route("/api/auth/logout", post(logout).options(preflight))
            .route_layer(from_fn_with_state(codec, session_middleware))
            .route_layer(from_fn_with_state(limiter, rate_limit_middleware))
            .with_state(Arc::new(*self));
        router.merge(routes)
    }
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterParams {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, max = 30))]
    password: String,
    #[validate(length(min = 1, max = 30), custom(function = "printable_ascii"))]
    fullname: String,
}

async fn register(
    State(h): State<Arc<AuthHandler>>,
    ValidatedJson(params): ValidatedJson<RegisterParams>,
) -> Result<Response, ApiError> {
    match h
        .accounts
        .register(&params.email, &params.password, &params.fullname)
        .await
    {
        Ok(account) => Ok((StatusCode::CREATED, Json(account)).into_response()),
        Err(AccountError::Repo(e)) if e.is_unique_violation() => {
            Err(ApiError::conflict("account already exists"))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize, Validate)]
struct LoginParams {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

async fn login(
    State(h): State<Arc<AuthHandler>>,
    transport: Transport,
    MaybeSession(current): MaybeSession,
    ValidatedJson(params): ValidatedJson<LoginParams>,
) -> Result<Response, ApiError> {
    let account = h.accounts.login(&params.email, &params.password).await?;

    // Already signed in as this account: keep the existing token.
    if current.is_some_and(|s| s.account_id == account.id) {
        return Ok(Json(account).into_response());
    }

    let token = h
        .codec
        .issue(Session {
            account_id: account.id,
            group_id: account.group_id,
        })
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to sign session token");
            ApiError::Unprocessable("failed to sign token".into())
        })?;

    let jar = CookieJar::new().add(cookie::session_cookie(&token, transport.secure));
    Ok((jar, Json(account)).into_response())
}

/// Clears the cookie. Tokens already handed out stay valid until they expire.
async fn logout(transport: Transport) -> impl IntoResponse {
    let jar = CookieJar::new().add(cookie::expired_cookie(transport.secure));
    (StatusCode::OK, jar)
}
