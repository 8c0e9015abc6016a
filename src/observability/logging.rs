//! Structured logging.
//!
//! `RUST_LOG` wins when set. Otherwise debug mode turns on debug output for
//! this crate and `tower_http`, and the configured level applies everywhere.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(debug: bool, level: &str) -> String {
    if debug {
        format!("{},ledger_server=debug,tower_http=debug", level)
    } else {
        level.to_string()
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(debug: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug, level)));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(debug))
        .try_init();

    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false, "warn"), "warn");
        assert_eq!(
            default_filter(true, "info"),
            "info,ledger_server=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(false, "info");
        init_logging(true, "debug");
    }
}
