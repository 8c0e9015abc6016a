//! HTTP-facing error type.
//!
//! Every handler and middleware failure ends up as an [`ApiError`]. The
//! response body is a short plain-text message; the underlying cause rides
//! along as an [`ErrorDetail`] response extension for the logging and
//! error-translation middlewares.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::repository::{RepoError, SQLITE_CONSTRAINT_UNIQUE};
use crate::services::AccountError;

/// Body used for every 5xx response.
pub const INTERNAL_MESSAGE: &str = "internal server error";

/// Cause of an error response, attached as a response extension.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Conflict(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("{0}")]
    Unprocessable(String),

    #[error("too many requests")]
    TooManyRequests,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = ErrorDetail(self.to_string());

        // Never put the internal cause in the body here; the translation
        // middleware decides whether debug mode may reveal it.
        let body = match self {
            Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        };

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(detail);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NoRows => Self::not_found("not found"),
            RepoError::Database { code, .. } if code == SQLITE_CONSTRAINT_UNIQUE => {
                Self::conflict("already exists")
            }
            other => Self::internal(other),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound => Self::unauthorized("account not found"),
            AccountError::WrongPassword => Self::unauthorized("incorrect password"),
            AccountError::Repo(e) => e.into(),
            other => Self::internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::TooManyRequests.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Unprocessable("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_client_error_keeps_message() {
        let response = ApiError::conflict("account already exists").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_text(response).await, "account already exists");
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let response = ApiError::internal("disk on fire").into_response();
        let detail = response.extensions().get::<ErrorDetail>().cloned().unwrap();
        assert_eq!(detail.0, "disk on fire");
        assert_eq!(body_text(response).await, INTERNAL_MESSAGE);
    }

    #[test]
    fn test_repo_error_mapping() {
        assert!(matches!(ApiError::from(RepoError::NoRows), ApiError::NotFound(_)));
        assert!(matches!(
            ApiError::from(RepoError::Database {
                code: SQLITE_CONSTRAINT_UNIQUE,
                message: "UNIQUE constraint failed".into()
            }),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(RepoError::Database {
                code: 1,
                message: "boom".into()
            }),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_account_error_mapping() {
        let err = ApiError::from(AccountError::WrongPassword);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "incorrect password");
        assert_eq!(
            ApiError::from(AccountError::NotFound).to_string(),
            "account not found"
        );
    }
}
