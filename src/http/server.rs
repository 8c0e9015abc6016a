//! HTTP server setup.
//!
//! # Responsibilities
//! - Mount every route group from the container
//! - Wire up global middleware (request ID, CORS, body limit, errors, logging)
//! - Catch-all 404 / 405 responders
//! - Serve plain TCP or TLS until the shutdown signal fires

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::config::ServerConfig;
use crate::container::Container;
use crate::http::error::ApiError;
use crate::http::extract::Transport;
use crate::http::handlers::HANDLERS;
use crate::http::middleware::{
    cors_middleware, error_translation_middleware, logging_middleware, CorsPolicy, DebugMode,
};
use crate::http::tls::load_tls_config;
use crate::security::limit_body;

/// HTTP server for the ledger API.
pub struct HttpServer {
    router: Router,
    config: Arc<ServerConfig>,
}

impl HttpServer {
    /// Mount every route group using components from the container.
    ///
    /// # Panics
    /// If a route group needs a component the container does not hold.
    pub fn new(container: &Container) -> Self {
        let config: Arc<ServerConfig> = container.lookup("config");
        let debug: bool = container.value("debug");

        let mut routes = Router::new();
        for provider in HANDLERS {
            routes = provider(container).mount(routes);
        }

        let router = Self::build_router(routes, &config, debug);
        Self { router, config }
    }

    /// Global layers, listed inner to outer.
    fn build_router(routes: Router, config: &ServerConfig, debug: bool) -> Router {
        let router = routes
            .fallback(fallback)
            .method_not_allowed_fallback(method_not_allowed)
            .layer(from_fn(logging_middleware))
            .layer(from_fn_with_state(DebugMode(debug), error_translation_middleware));

        let mut router = limit_body(router, config.security.max_body_size);

        if let Some(origin) = &config.cors.allowed_origin {
            match CorsPolicy::new(origin) {
                Some(policy) => {
                    router = router.layer(from_fn_with_state(Arc::new(policy), cors_middleware));
                }
                None => tracing::warn!(origin = %origin, "CORS origin unusable, CORS disabled"),
            }
        }

        router
            .layer(Extension(Transport {
                secure: config.listener.tls.is_some(),
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` completes, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        match &self.config.listener.tls {
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await?;
            }
            Some(tls) => {
                let rustls =
                    load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
                let handle = axum_server::Handle::new();
                let grace = Duration::from_secs(self.config.listener.shutdown_grace_secs);

                let trigger = handle.clone();
                tokio::spawn(async move {
                    shutdown.await;
                    trigger.graceful_shutdown(Some(grace));
                });

                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Unknown path: preflight gets 204, everything else 404.
async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        ApiError::not_found("not found").into_response()
    }
}

/// Known path, wrong method: preflight still gets 204.
async fn method_not_allowed(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        ApiError::MethodNotAllowed.into_response()
    }
}
