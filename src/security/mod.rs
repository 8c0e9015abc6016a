//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (body ceiling, every route)
//!     → rate_limit.rs (per-IP token bucket, mounted per route group)
//!     → http::middleware::session (token → Session claim)
//! ```
//!
//! # Design Decisions
//! - Rate limiting keys on the peer address and runs before authentication
//! - Limiter state is process-local; nothing is shared between instances
//! - Fail closed: a rejected request never reaches a handler

pub mod limits;
pub mod rate_limit;

pub use limits::limit_body;
pub use rate_limit::{rate_limit_middleware, RateLimiter};
