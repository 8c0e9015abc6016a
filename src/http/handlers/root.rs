//! `/api/summary`.

use std::sync::Arc;

use axum::{extract::State, middleware::from_fn_with_state, routing::get, Json, Router};

use super::{account, Mount};
use crate::container::Container;
use crate::http::error::ApiError;
use crate::http::extract::CurrentSession;
use crate::http::middleware::require_session;
use crate::repository::{AccountSummary, Repository};
use crate::session::SessionCodec;

pub struct RootHandler {
    codec: Arc<SessionCodec>,
    repo: Arc<dyn Repository>,
}

pub fn provider(c: &Container) -> Box<dyn Mount> {
    Box::new(RootHandler {
        codec: c.lookup("session"),
        repo: c.lookup("repository"),
    })
}

impl Mount for RootHandler {
    fn mount(self: Box<Self>, router: Router) -> Router {
        let codec = self.codec.clone();
        let routes = Router::new()
            .route("/api/summary", get(get_summary))
            .route_layer(from_fn_with_state(codec, require_session))
            .with_state(Arc::new(*self));
        router.merge(routes)
    }
}

async fn get_summary(
    State(h): State<Arc<RootHandler>>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<AccountSummary>, ApiError> {
    account::summary(h.repo.as_ref(), session.account_id).await
}
