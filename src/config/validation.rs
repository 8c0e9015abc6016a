//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Every failure is
//! collected so an operator sees the whole list at once.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("secret must not be empty")]
    MissingSecret,

    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("rate_limit.requests_per_second must be positive, got {0}")]
    Rate(f64),

    #[error("rate_limit.burst_size must be at least 1")]
    Burst,

    #[error("rate_limit.sweep_interval_secs must be at least 1")]
    SweepInterval,

    #[error("security.max_body_size must be positive")]
    BodySize,

    #[error("listener.tls.{0} must not be empty")]
    TlsPath(&'static str),
}

/// Validate a configuration, returning every failure found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.secret.trim().is_empty() {
        errors.push(ValidationError::MissingSecret);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::TlsPath("cert_path"));
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::TlsPath("key_path"));
        }
    }

    let limits = &config.rate_limit;
    if limits.requests_per_second.is_nan() || limits.requests_per_second <= 0.0 {
        errors.push(ValidationError::Rate(limits.requests_per_second));
    }
    if limits.burst_size == 0 {
        errors.push(ValidationError::Burst);
    }
    if limits.sweep_interval_secs == 0 {
        errors.push(ValidationError::SweepInterval);
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::BodySize);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
