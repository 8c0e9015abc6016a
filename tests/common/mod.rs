//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use ledger_server::config::ServerConfig;
use ledger_server::container::Container;
use ledger_server::http::HttpServer;
use ledger_server::lifecycle::{self, Shutdown, StartupError};
use ledger_server::repository::{MemoryRepository, Repository};
use ledger_server::security::RateLimiter;
use ledger_server::services::AccountService;
use ledger_server::session::{Session, SessionCodec};

pub const SECRET: &str = "integration-test-secret-0123456789";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        secret: SECRET.into(),
        ..ServerConfig::default()
    }
}

/// Same wiring as the binary, with cheap password hashing.
pub fn container_with_repo(config: ServerConfig, repo: Arc<dyn Repository>) -> Container {
    let mut c = Container::new();
    let debug = config.debug;
    let config = Arc::new(config);

    c.register("session", Arc::new(SessionCodec::new(&config.secret)));
    c.register("ratelimit", Arc::new(RateLimiter::new(&config.rate_limit)));
    c.register("repository", repo);
    c.register("config", config);
    c.set_value("debug", debug);
    c.provide("service/account", |c| {
        let params = argon2::Params::new(1024, 1, 1, None).unwrap();
        Arc::new(AccountService::with_params(c.lookup("repository"), params))
    });
    c
}

pub fn test_container(config: ServerConfig) -> Container {
    let repo: Arc<dyn Repository> =
        Arc::new(MemoryRepository::new(config.storage.snapshot_path.clone()));
    container_with_repo(config, repo)
}

pub fn router(config: ServerConfig) -> Router {
    HttpServer::new(&test_container(config)).router()
}

/// Serve on an ephemeral port until the returned `Shutdown` is triggered.
pub async fn spawn_server(
    container: Container,
) -> (SocketAddr, Shutdown, JoinHandle<Result<(), StartupError>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(lifecycle::serve(container, listener, shutdown.clone()));
    (addr, shutdown, handle)
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn json(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// `token=<value>` from a Set-Cookie header, if the response set one.
pub fn token_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("token="))
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

pub fn signup(email: &str) -> serde_json::Value {
    serde_json::json!({
        "email": email,
        "password": "correct horse",
        "fullname": "Test User",
    })
}

pub fn credentials(email: &str) -> serde_json::Value {
    serde_json::json!({ "email": email, "password": "correct horse" })
}

/// Register `email` and log in; returns the `token=...` cookie.
pub async fn register_and_login(router: &Router, email: &str) -> String {
    let response = send(router, json("POST", "/api/auth/register", signup(email))).await;
    assert_eq!(response.status(), 201);
    let response = send(router, json("POST", "/api/auth/login", credentials(email))).await;
    assert_eq!(response.status(), 200);
    token_cookie(&response).expect("login sets the token cookie")
}

pub fn cookie_for(codec: &SessionCodec, session: Session) -> String {
    format!("token={}", codec.issue(session).unwrap().value)
}

pub fn expired_cookie(session: Session) -> String {
    let codec = SessionCodec::new(SECRET);
    let issued = codec.issue_at(session, Utc::now() - Duration::days(70)).unwrap();
    format!("token={}", issued.value)
}

pub fn foreign_cookie(session: Session) -> String {
    cookie_for(&SessionCodec::new("some-other-secret-entirely-9876543210"), session)
}
