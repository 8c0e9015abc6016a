//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Env { key: &'static str, reason: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ServerConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML configuration file without validating it.
pub fn read_config_file(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` resolves a variable name to its value; the binary passes
/// `std::env::var`.
pub fn apply_env<F>(config: &mut ServerConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("HOST");
    let port = lookup("PORT");
    if host.is_some() || port.is_some() {
        let (default_host, default_port) = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.to_string()))
            .unwrap_or_else(|| ("0.0.0.0".to_string(), "6969".to_string()));
        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| ConfigError::Env {
                    key: "PORT",
                    reason: e.to_string(),
                })?
                .to_string(),
            None => default_port,
        };
        config.listener.bind_address = format!("{}:{}", host.unwrap_or(default_host), port);
    }

    if let Some(secret) = lookup("SECRET") {
        config.secret = secret;
    }

    if let Some(debug) = lookup("DEBUG") {
        config.debug = debug.parse::<bool>().map_err(|e| ConfigError::Env {
            key: "DEBUG",
            reason: e.to_string(),
        })?;
    }

    if let Some(origin) = lookup("CORS_ORIGIN") {
        let url = origin.parse().map_err(|e: url::ParseError| ConfigError::Env {
            key: "CORS_ORIGIN",
            reason: e.to_string(),
        })?;
        config.cors.allowed_origin = Some(url);
    }

    if let Some(path) = lookup("SNAPSHOT_PATH") {
        config.storage.snapshot_path = Some(PathBuf::from(path));
    }

    Ok(())
}
