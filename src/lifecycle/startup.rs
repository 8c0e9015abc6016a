//! Startup orchestration (the composition root).
//!
//! # Responsibilities
//! - Register every component in the container
//! - Mount the HTTP surface
//! - Initialize components, serve, then terminate them
//!
//! # Design Decisions
//! - Fail fast: any initialization error is fatal and logged per component
//! - Terminate runs even when serving fails, so snapshots get written

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::container::{Container, LifecycleErrors};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability;
use crate::repository::{MemoryRepository, Repository};
use crate::security::RateLimiter;
use crate::services::AccountService;
use crate::session::SessionCodec;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleErrors),
}

/// Register the components every route group depends on.
pub fn build_container(config: ServerConfig) -> Container {
    let mut c = Container::new();
    let debug = config.debug;
    let config = Arc::new(config);

    let repository: Arc<dyn Repository> =
        Arc::new(MemoryRepository::new(config.storage.snapshot_path.clone()));

    c.register("session", Arc::new(SessionCodec::new(&config.secret)));
    c.register("ratelimit", Arc::new(RateLimiter::new(&config.rate_limit)));
    c.register("repository", repository);
    c.register("config", config);
    c.set_value("debug", debug);
    c.provide("service/account", |c| {
        Arc::new(AccountService::new(c.lookup("repository")))
    });
    c
}

fn log_errors(errors: &LifecycleErrors) {
    for (name, err) in errors.iter() {
        tracing::error!(from = name, phase = errors.phase().as_str(), "{}", err);
    }
}

/// Initialize, serve on `listener` until `shutdown` fires, then terminate.
pub async fn serve(
    container: Container,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let server = HttpServer::new(&container);

    if let Err(errors) = container.initialize_all().await {
        log_errors(&errors);
        return Err(errors.into());
    }

    let served = server.run(listener, shutdown.wait()).await;

    if let Err(errors) = container.terminate_all().await {
        log_errors(&errors);
    }

    served.map_err(StartupError::from)
}

/// Run the server with OS signal handling until SIGINT or SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        tls = config.listener.tls.is_some(),
        debug = config.debug,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        let signal = signals::wait_for_signal().await;
        tracing::info!(signal, "Shutdown signal received");
        trigger.trigger();
    });

    serve(build_container(config), listener, shutdown).await
}
