//! Request pipeline behaviour, driven in-process through the assembled router.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use ledger_server::config::RateLimitConfig;
use ledger_server::container::Component;
use ledger_server::http::HttpServer;
use ledger_server::repository::{
    Account, AccountSummary, Category, CategoryType, NewAccount, NewCategory, NewTransaction,
    RepoError, Repository, Transaction, TransactionFilter,
};
use ledger_server::session::{Session, SessionCodec};
use uuid::Uuid;

fn session() -> Session {
    Session {
        account_id: 1,
        group_id: 1,
    }
}

#[tokio::test]
async fn test_strict_routes_reject_missing_token() {
    let app = router(test_config());
    let response = send(&app, get("/account")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "unauthorized");
}

#[tokio::test]
async fn test_strict_routes_reject_bad_tokens() {
    let app = router(test_config());

    for cookie in [expired_cookie(session()), foreign_cookie(session())] {
        let response = send(&app, with_cookie(get("/account/summary"), &cookie)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "cookie {}", cookie);
    }

    let response = send(&app, with_cookie(get("/categories"), "token=garbage")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_strict_routes_accept_valid_token() {
    let app = router(test_config());
    let cookie = register_and_login(&app, "strict@example.com").await;

    let response = send(&app, with_cookie(get("/account"), &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["email"], "strict@example.com");
    assert!(body.get("passhash").is_none());
}

#[tokio::test]
async fn test_best_effort_treats_bad_tokens_as_anonymous() {
    let app = router(test_config());
    let email = "anon@example.com";
    let response = send(&app, json("POST", "/api/auth/register", signup(email))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same request with no token, an expired one and a foreign one: each is
    // treated as signed out and gets a fresh cookie.
    let cookies = [
        None,
        Some(expired_cookie(session())),
        Some(foreign_cookie(session())),
    ];
    for cookie in cookies {
        let mut request = json("POST", "/api/auth/login", credentials(email));
        if let Some(cookie) = &cookie {
            request = with_cookie(request, cookie);
        }
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK, "cookie {:?}", cookie);
        assert!(token_cookie(&response).is_some(), "cookie {:?}", cookie);
    }
}

#[tokio::test]
async fn test_login_with_own_token_keeps_it() {
    let app = router(test_config());
    let email = "again@example.com";
    let cookie = register_and_login(&app, email).await;

    let request = with_cookie(json("POST", "/api/auth/login", credentials(email)), &cookie);
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(token_cookie(&response).is_none());
}

#[tokio::test]
async fn test_login_failures() {
    let app = router(test_config());
    let response = send(&app, json("POST", "/api/auth/login", credentials("nobody@example.com"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "account not found");

    register_and_login(&app, "someone@example.com").await;
    let wrong = serde_json::json!({ "email": "someone@example.com", "password": "wrong horse" });
    let response = send(&app, json("POST", "/api/auth/login", wrong)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "incorrect password");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = router(test_config());
    register_and_login(&app, "twice@example.com").await;
    let response = send(&app, json("POST", "/api/auth/register", signup("twice@example.com"))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_text(response).await, "account already exists");
}

#[tokio::test]
async fn test_validation_failure_names_field_and_rule() {
    let app = router(test_config());
    let response = send(&app, json("POST", "/api/auth/register", signup("not-an-email"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "invalid value for 'email': constraint 'email' failed"
    );
}

#[tokio::test]
async fn test_unknown_path_and_wrong_method() {
    let app = router(test_config());

    let response = send(&app, get("/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "not found");

    // Method mismatch is reported before authentication runs.
    let request = Request::builder()
        .method("DELETE")
        .uri("/categories")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_preflight_is_answered_without_cors_origin() {
    let app = router(test_config());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/nope")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_preflight_on_mounted_routes() {
    let app = router(test_config());
    for uri in ["/api/auth/login", "/account", "/transactions"] {
        let request = Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::NO_CONTENT, "{}", uri);
    }
}

#[tokio::test]
async fn test_bad_query_is_rejected() {
    let app = router(test_config());
    let cookie = register_and_login(&app, "query@example.com").await;

    let response = send(&app, with_cookie(get("/transactions?type=bogus"), &cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("bogus"));

    let response = send(&app, with_cookie(get("/transactions?type=income"), &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "[]");
}

#[tokio::test]
async fn test_cors_headers_and_preflight() {
    let mut config = test_config();
    config.cors.allowed_origin = Some("https://app.example.com/".parse().unwrap());
    let app = router(config);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/auth/login")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    // Ordinary responses carry the headers too.
    let response = send(&app, get("/account")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
}

#[tokio::test]
async fn test_rate_limit_rejects_over_budget() {
    let mut config = test_config();
    config.rate_limit = RateLimitConfig {
        requests_per_second: 0.001,
        burst_size: 3,
        ..RateLimitConfig::default()
    };
    let app = router(config);
    let logout = || {
        Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..3 {
        assert_eq!(send(&app, logout()).await.status(), StatusCode::OK);
    }
    let response = send(&app, logout()).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_text(response).await, "too many requests");

    // Preflight passes the exhausted limiter and does not refill it.
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(send(&app, logout()).await.status(), StatusCode::TOO_MANY_REQUESTS);

    // Authenticated routes are not rate limited.
    assert_eq!(send(&app, get("/account")).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = test_config();
    config.security.max_body_size = 64;
    let app = router(config);

    let body = serde_json::json!({
        "email": "big@example.com",
        "password": "x".repeat(200),
        "fullname": "Big",
    });
    let response = send(&app, json("POST", "/api/auth/register", body)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = router(test_config());

    let response = send(&app, get("/nope")).await;
    assert!(response.headers().contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/nope")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_session_cookie_attributes() {
    let app = router(test_config());
    let response = send(&app, json("POST", "/api/auth/register", signup("attrs@example.com"))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, json("POST", "/api/auth/login", credentials("attrs@example.com"))).await;
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Path=/"));
    assert!(!set_cookie.contains("Secure"));
}

/// A store whose every call fails with a driver error.
struct BrokenRepository;

impl Component for BrokenRepository {}

fn broken() -> RepoError {
    RepoError::Database {
        code: 10,
        message: "disk I/O error".into(),
    }
}

#[async_trait]
impl Repository for BrokenRepository {
    async fn create_account(&self, _: NewAccount) -> Result<Account, RepoError> {
        Err(broken())
    }

    async fn find_account_by_email(&self, _: &str) -> Result<Account, RepoError> {
        Err(broken())
    }

    async fn get_account(&self, _: i64) -> Result<Account, RepoError> {
        Err(broken())
    }

    async fn get_account_summary(&self, _: i64) -> Result<AccountSummary, RepoError> {
        Err(broken())
    }

    async fn create_category(&self, _: NewCategory) -> Result<Uuid, RepoError> {
        Err(broken())
    }

    async fn get_categories(
        &self,
        _: i64,
        _: Option<CategoryType>,
    ) -> Result<Vec<Category>, RepoError> {
        Err(broken())
    }

    async fn create_transaction(&self, _: NewTransaction) -> Result<Uuid, RepoError> {
        Err(broken())
    }

    async fn list_transactions(&self, _: TransactionFilter) -> Result<Vec<Transaction>, RepoError> {
        Err(broken())
    }
}

async fn broken_store_response(debug: bool) -> (StatusCode, String) {
    let mut config = test_config();
    config.debug = debug;
    let container = container_with_repo(config, Arc::new(BrokenRepository));
    let app = HttpServer::new(&container).router();

    let cookie = cookie_for(&SessionCodec::new(SECRET), session());
    let response = send(&app, with_cookie(get("/account"), &cookie)).await;
    (response.status(), body_text(response).await)
}

#[tokio::test]
async fn test_server_errors_hide_cause() {
    let (status, body) = broken_store_response(false).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "internal server error");
}

#[tokio::test]
async fn test_debug_mode_reveals_cause() {
    let (status, body) = broken_store_response(true).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "internal server error: database error 10: disk I/O error");
}
