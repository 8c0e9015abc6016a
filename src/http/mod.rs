//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP (or TLS) connection
//!     → server.rs (router assembly, global layers, serve loop)
//!     → middleware/ (cors, body ceiling, error translation, logging)
//!     → handlers/ (route groups with their own rate limit / session layers)
//!     → extract.rs (validated bodies and queries, session claim)
//!     → error.rs (ApiError → plain-text response)
//! ```

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod tls;

pub use error::{ApiError, ErrorDetail};
pub use extract::{CurrentSession, MaybeSession, Transport, ValidatedJson, ValidatedQuery};
pub use server::HttpServer;
