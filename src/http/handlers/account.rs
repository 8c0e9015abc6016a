//! `/account`: the signed-in account.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use super::{printable_ascii, Mount};
use crate::container::Container;
use crate::http::error::ApiError;
use crate::http::extract::{CurrentSession, ValidatedJson};
use crate::http::middleware::require_session;
use crate::repository::{Account, AccountSummary, RepoError, Repository};
use crate::services::{AccountError, AccountService};
use crate::session::SessionCodec;

pub struct AccountHandler {
    codec: Arc<SessionCodec>,
    repo: Arc<dyn Repository>,
    accounts: Arc<AccountService>,
}

pub fn provider(c: &Container) -> Box<dyn Mount> {
    Box::new(AccountHandler {
        codec: c.lookup("session"),
        repo: c.lookup("repository"),
        accounts: c.lookup("service/account"),
    })
}

impl Mount for AccountHandler {
    fn mount(self: Box<Self>, router: Router) -> Router {
        let codec = self.codec.clone();
        let routes = Router::new()
            .route("/account", get(get_account).post(create_account))
            .route("/account/summary", get(get_summary))
            .route_layer(from_fn_with_state(codec, require_session))
            .with_state(Arc::new(*self));
        router.merge(routes)
    }
}

async fn get_account(
    State(h): State<Arc<AccountHandler>>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(h.repo.get_account(session.account_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateParams {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, max = 50), custom(function = "printable_ascii"))]
    fullname: String,
    #[validate(length(min = 8, max = 50), custom(function = "printable_ascii"))]
    password: String,
}

async fn create_account(
    State(h): State<Arc<AccountHandler>>,
    CurrentSession(_): CurrentSession,
    ValidatedJson(params): ValidatedJson<CreateParams>,
) -> Result<(StatusCode, String), ApiError> {
    match h.repo.find_account_by_email(&params.email).await {
        Ok(_) => return Err(ApiError::conflict("account already exists")),
        Err(RepoError::NoRows) => {}
        Err(e) => return Err(e.into()),
    }

    let account = h
        .accounts
        .register(&params.email, &params.password, &params.fullname)
        .await
        .map_err(|e| match e {
            AccountError::Repo(e) if e.is_unique_violation() => {
                ApiError::conflict("account already exists")
            }
            other => other.into(),
        })?;
    Ok((StatusCode::CREATED, account.id.to_string()))
}

async fn get_summary(
    State(h): State<Arc<AccountHandler>>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<AccountSummary>, ApiError> {
    summary(h.repo.as_ref(), session.account_id).await
}

pub(super) async fn summary(
    repo: &dyn Repository,
    account_id: i64,
) -> Result<Json<AccountSummary>, ApiError> {
    match repo.get_account_summary(account_id).await {
        Ok(summary) => Ok(Json(summary)),
        Err(RepoError::NoRows) => Err(ApiError::not_found("account not found")),
        Err(e) => Err(e.into()),
    }
}
