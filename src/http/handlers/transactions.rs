//! `/transactions`: the caller's (or the caller's group's) transactions.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::Mount;
use crate::container::Container;
use crate::http::error::ApiError;
use crate::http::extract::{CurrentSession, ValidatedJson, ValidatedQuery};
use crate::http::middleware::require_session;
use crate::repository::{
    CategoryType, NewTransaction, Owner, Repository, Transaction, TransactionFilter,
};
use crate::session::SessionCodec;

pub struct TransactionsHandler {
    codec: Arc<SessionCodec>,
    repo: Arc<dyn Repository>,
}

pub fn provider(c: &Container) -> Box<dyn Mount> {
    Box::new(TransactionsHandler {
        codec: c.lookup("session"),
        repo: c.lookup("repository"),
    })
}

impl Mount for TransactionsHandler {
    fn mount(self: Box<Self>, router: Router) -> Router {
        let codec = self.codec.clone();
        let routes = Router::new()
            .route("/transactions", get(list).post(create))
            .route_layer(from_fn_with_state(codec, require_session))
            .with_state(Arc::new(*self));
        router.merge(routes)
    }
}

#[derive(Debug, Deserialize, Validate)]
struct ListParams {
    cid: Option<Uuid>,
    #[serde(rename = "type")]
    kind: Option<CategoryType>,
    #[serde(default)]
    grouped: bool,
}

async fn list(
    State(h): State<Arc<TransactionsHandler>>,
    CurrentSession(session): CurrentSession,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let owner = if params.grouped {
        Owner::Group(session.group_id)
    } else {
        Owner::Account(session.account_id)
    };
    let found = h
        .repo
        .list_transactions(TransactionFilter {
            owner,
            category_id: params.cid,
            kind: params.kind,
        })
        .await?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateParams {
    cid: Option<Uuid>,
    #[validate(range(exclusive_min = 0.0))]
    amount: f64,
    time: DateTime<Utc>,
    #[validate(length(min = 1, max = 100))]
    title: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    note: String,
}

async fn create(
    State(h): State<Arc<TransactionsHandler>>,
    CurrentSession(session): CurrentSession,
    ValidatedJson(params): ValidatedJson<CreateParams>,
) -> Result<(StatusCode, String), ApiError> {
    if let Some(cid) = params.cid {
        let categories = h.repo.get_categories(session.group_id, None).await?;
        if !categories.iter().any(|c| c.id == cid) {
            return Err(ApiError::bad_request("invalid category"));
        }
    }

    let id = h
        .repo
        .create_transaction(NewTransaction {
            account_id: session.account_id,
            category_id: params.cid,
            amount: params.amount,
            timestamp: params.time,
            title: params.title,
            note: params.note,
        })
        .await?;
    Ok((StatusCode::CREATED, id.to_string()))
}
