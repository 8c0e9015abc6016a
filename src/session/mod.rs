//! Session tokens.
//!
//! # Data Flow
//! ```text
//! login:   Session claim → codec.rs (sign, iat/exp) → cookie.rs (Set-Cookie: token=...)
//! request: Cookie: token=... → cookie.rs (extract) → codec.rs (inspect)
//!              → NoToken | Invalid | Valid(Session)
//! logout:  cookie.rs (empty, already-expired token cookie)
//! ```
//!
//! # Design Decisions
//! - Stateless: nothing is stored server-side, so logout cannot revoke a
//!   token that was copied before it; it stays valid until it expires
//! - One codec backs both the strict and the best-effort middleware

pub mod codec;
pub mod cookie;

pub use codec::{IssuedToken, Session, SessionCodec, TokenError, TokenState};
pub use cookie::TOKEN_COOKIE;
