//! Request-handling core of a small multi-tenant ledger service.
//!
//! A dependency container wires named components together and runs their
//! lifecycle hooks concurrently; an axum middleware pipeline rate limits,
//! authenticates and logs requests before they reach the route groups.

pub mod config;
pub mod container;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod repository;
pub mod security;
pub mod services;
pub mod session;

pub use config::schema::ServerConfig;
pub use container::Container;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
