//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, request id on every request line)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is generated at the edge and echoed back in `x-request-id`
//! - Metric updates are no-ops until an exporter is installed, so tests and
//!   library users pay nothing for them

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
