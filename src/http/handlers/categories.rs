//! `/categories`: categories shared by the caller's group.

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

use super::Mount;
use crate::container::Container;
use crate::http::error::ApiError;
use crate::http::extract::{CurrentSession, ValidatedJson};
use crate::http::middleware::require_session;
use crate::repository::{Category, CategoryType, NewCategory, Repository};
use crate::session::SessionCodec;

pub struct CategoriesHandler {
    codec: Arc<SessionCodec>,
    repo: Arc<dyn Repository>,
}

pub fn provider(c: &Container) -> Box<dyn Mount> {
    Box::new(CategoriesHandler {
        codec: c.lookup("session"),
        repo: c.lookup("repository"),
    })
}

impl Mount for CategoriesHandler {
    fn mount(self: Box<Self>, router: Router) -> Router {
        let codec = self.codec.clone();
        let routes = Router::new()
            .route("/categories", get(list).post(create))
            .route_layer(from_fn_with_state(codec, require_session))
            .with_state(Arc::new(*self));
        router.merge(routes)
    }
}

async fn list(
    State(h): State<Arc<CategoriesHandler>>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(h.repo.get_categories(session.group_id, None).await?))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateParams {
    #[validate(length(min = 1, max = 20))]
    name: String,
    #[serde(rename = "type")]
    kind: CategoryType,
    #[validate(length(max = 16))]
    emoji: Option<String>,
    #[validate(length(max = 16))]
    color: Option<String>,
}

async fn create(
    State(h): State<Arc<CategoriesHandler>>,
    CurrentSession(session): CurrentSession,
    ValidatedJson(params): ValidatedJson<CreateParams>,
) -> Result<(StatusCode, String), ApiError> {
    let id = h
        .repo
        .create_category(NewCategory {
            group_id: session.group_id,
            name: params.name,
            kind: params.kind,
            emoji: params.emoji,
            color: params.color,
        })
        .await?;
    Ok((StatusCode::CREATED, id.to_string()))
}
