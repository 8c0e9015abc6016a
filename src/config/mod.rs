//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: HOST, PORT, SECRET, ...)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → registered in the container as "config"
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults except the signing secret
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CorsConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig, SecurityConfig, ServerConfig,
    StorageConfig, TlsConfig,
};
