//! Signed, expiring session tokens (HS256 JWT).

use chrono::{DateTime, Months, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::Component;

/// Token validity.
pub const TOKEN_TTL: Months = Months::new(1);

/// Identity carried by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "aid")]
    pub account_id: i64,
    #[serde(rename = "gid")]
    pub group_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    session: Session,
    iat: i64,
    exp: i64,
}

/// Why a token was rejected.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("token expiry out of range")]
    ExpiryOverflow,
}

/// Per-request verification outcome.
#[derive(Debug)]
pub enum TokenState {
    NoToken,
    Invalid(TokenError),
    Valid(Session),
}

impl TokenState {
    pub fn label(&self) -> &'static str {
        match self {
            TokenState::NoToken => "none",
            TokenState::Invalid(_) => "invalid",
            TokenState::Valid(_) => "valid",
        }
    }
}

/// A freshly signed token and its validity window.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens with a single shared secret.
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Component for SessionCodec {}

impl SessionCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a token for `session`, valid from now for one month.
    pub fn issue(&self, session: Session) -> Result<IssuedToken, TokenError> {
        self.issue_at(session, Utc::now())
    }

    /// Sign a token as if issued at `now`.
    pub fn issue_at(&self, session: Session, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = now
            .checked_add_months(TOKEN_TTL)
            .ok_or(TokenError::ExpiryOverflow)?;
        let claims = Claims {
            session,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            value,
            issued_at: now,
            expires_at,
        })
    }

    /// Verify signature, algorithm and expiry, then decode the claim.
    pub fn verify(&self, token: &str) -> Result<Session, TokenError> {
        if !is_well_formed(token) {
            return Err(TokenError::Malformed);
        }
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.session)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }

    /// Classify the token found in a request, if any.
    pub fn inspect(&self, token: Option<&str>) -> TokenState {
        match token {
            None => TokenState::NoToken,
            Some(token) => match self.verify(token) {
                Ok(session) => TokenState::Valid(session),
                Err(e) => TokenState::Invalid(e),
            },
        }
    }
}

/// Envelope check: three non-empty base64url segments.
fn is_well_formed(token: &str) -> bool {
    let mut segments = 0;
    for segment in token.split('.') {
        segments += 1;
        if segment.is_empty()
            || !segment
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return false;
        }
    }
    segments == 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn session() -> Session {
        Session {
            account_id: 42,
            group_id: 7,
        }
    }

    #[test]
    fn test_round_trip() {
        let codec = SessionCodec::new(SECRET);
        let token = codec.issue(session()).unwrap();

        assert_eq!(codec.verify(&token.value).unwrap(), session());
        assert!(token.expires_at > token.issued_at + Duration::days(27));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let codec = SessionCodec::new(SECRET);
        let long_ago = Utc::now() - Duration::days(70);
        let token = codec.issue_at(session(), long_ago).unwrap();

        assert!(matches!(codec.verify(&token.value), Err(TokenError::Expired)));
        assert!(matches!(
            codec.inspect(Some(&token.value)),
            TokenState::Invalid(TokenError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = SessionCodec::new(SECRET);
        let verifier = SessionCodec::new("another-secret-entirely-different!!");
        let token = issuer.issue(session()).unwrap();

        assert!(matches!(
            verifier.inspect(Some(&token.value)),
            TokenState::Invalid(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_corrupted_tokens_never_panic() {
        let codec = SessionCodec::new(SECRET);
        let token = codec.issue(session()).unwrap().value;

        let truncated = &token[..token.len() / 2];
        let mut flipped = token.clone().into_bytes();
        let sig = token.rfind('.').unwrap() + 1;
        flipped[sig] = if flipped[sig] == b'A' { b'B' } else { b'A' };
        let flipped = String::from_utf8(flipped).unwrap();

        for bad in [truncated, flipped.as_str(), "", "a.b", "a..c", "not a token", "x.y.z"] {
            assert!(
                matches!(codec.inspect(Some(bad)), TokenState::Invalid(_)),
                "{:?} should be invalid",
                bad
            );
        }
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let codec = SessionCodec::new(SECRET);
        let now = Utc::now();
        let claims = Claims {
            session: session(),
            iat: now.timestamp(),
            exp: (now + Duration::days(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(codec.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_no_token() {
        let codec = SessionCodec::new(SECRET);
        assert!(matches!(codec.inspect(None), TokenState::NoToken));
    }
}
