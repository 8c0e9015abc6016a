//! The `token` cookie that carries a session between requests.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use time::OffsetDateTime;

use crate::session::codec::IssuedToken;

/// Cookie name carrying the signed token.
pub const TOKEN_COOKIE: &str = "token";

/// The cookie outlives the token slightly to absorb clock skew.
pub const COOKIE_SKEW_SECS: i64 = 60;

fn skew() -> Duration {
    Duration::seconds(COOKIE_SKEW_SECS)
}

/// Read the raw token from the request's cookies.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

/// Cookie set at login.
pub fn session_cookie(token: &IssuedToken, secure: bool) -> Cookie<'static> {
    base(token.value.clone(), token.expires_at + skew(), secure)
}

/// Cookie set at logout: empty and already expired, so the client drops it.
pub fn expired_cookie(secure: bool) -> Cookie<'static> {
    base(String::new(), Utc::now() - skew(), secure)
}

fn base(value: String, expires: DateTime<Utc>, secure: bool) -> Cookie<'static> {
    let expires = OffsetDateTime::from_unix_timestamp(expires.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    Cookie::build((TOKEN_COOKIE, value))
        .path("/")
        .expires(expires)
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn test_session_cookie_attributes() {
        let now = Utc::now();
        let token = IssuedToken {
            value: "a.b.c".into(),
            issued_at: now,
            expires_at: now + Duration::days(30),
        };
        let cookie = session_cookie(&token, true);

        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "a.b.c");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        let expires = cookie.expires_datetime().unwrap().unix_timestamp();
        assert_eq!(expires, (token.expires_at + skew()).timestamp());
    }

    #[test]
    fn test_expired_cookie_is_in_the_past() {
        let cookie = expired_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.secure(), Some(false));
        assert!(cookie.expires_datetime().unwrap() < OffsetDateTime::now_utc());
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark; token=abc.def.ghi".parse().unwrap());
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));

        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }
}
