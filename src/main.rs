//! Ledger server.
//!
//! # Architecture Overview
//!
//! ```text
//!  Client ──▶ request id ─▶ cors ─▶ body limit ─▶ errors ─▶ logging
//!                                                              │
//!             ┌────────────────────────────────────────────────┘
//!             ▼
//!        route group: [rate limit] ─▶ session (best-effort | strict) ─▶ handler
//!                                                                          │
//!                                      Container lookups at mount time ◀───┘
//!                                      (config, session, ratelimit,
//!                                       repository, service/account)
//! ```

use std::path::PathBuf;

use clap::Parser;

use ledger_server::config::load_config;
use ledger_server::lifecycle;
use ledger_server::observability::init_logging;

#[derive(Parser)]
#[command(name = "ledger-server")]
#[command(about = "Multi-tenant ledger API server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug mode (verbose logs, error causes in 5xx responses).
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    config.debug |= args.debug;

    init_logging(config.debug, &config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ledger-server starting");

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
