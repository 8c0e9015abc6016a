//! Request interceptors.
//!
//! # Data Flow
//! ```text
//! global (every route, outer → inner):
//!     request id → transport flag → cors.rs → body ceiling
//!     → errors.rs (5xx body translation) → logging.rs
//! per route group (route_layer):
//!     security::rate_limit → session.rs (best-effort or strict) → handler
//! ```

pub mod cors;
pub mod errors;
pub mod logging;
pub mod session;

pub use cors::{cors_middleware, CorsPolicy};
pub use errors::{error_translation_middleware, DebugMode};
pub use logging::logging_middleware;
pub use session::{require_session, session_middleware};
