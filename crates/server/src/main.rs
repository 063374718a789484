//! `pwshare`: service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from `<WEB_ENV>.yaml` and environment variables.
//! 2. Initialise the telemetry pipeline (OTEL + tracing).
//! 3. Build the [`SymmetricEncoder`] and verify the key material.
//! 4. Connect the storage gateway and create the secrets table.
//! 5. Build the link service, health checks, and Axum router.
//! 6. Serve until SIGINT/SIGTERM, then drain in-flight requests.

mod config;
mod crypto;
mod health;
mod link;
mod server;
mod storage;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use config::Config;
use crypto::SymmetricEncoder;
use health::{HealthCheck, StorageHealthCheck};
use link::LinkService;
use server::middleware::MiddlewareConfig;
use server::state::AppState;
use storage::{SessionFactory, SqlStore};
use telemetry::OtelMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::load().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        provider = %cfg.db_provider,
        "pwshare starting"
    );

    // -----------------------------------------------------------------------
    // 3. Encoder
    // -----------------------------------------------------------------------
    let encoder = SymmetricEncoder::new(cfg.encrypt_secret.as_bytes(), cfg.encrypt_iv_bytes()?);
    encoder
        .check()
        .map_err(|e| anyhow::anyhow!(e))
        .context("encryption key material rejected")?;

    // -----------------------------------------------------------------------
    // 4. Storage
    // -----------------------------------------------------------------------
    let store = SqlStore::connect(
        &cfg.db_provider,
        &cfg.db_connection_string,
        &cfg.store_options(),
    )
    .await
    .context("failed to connect to storage")?;
    store
        .migrate()
        .await
        .context("failed to prepare storage schema")?;

    // -----------------------------------------------------------------------
    // 5. Service, health checks, router
    // -----------------------------------------------------------------------
    let sessions: Arc<dyn SessionFactory> = Arc::new(store.clone());
    let links = LinkService::new(sessions.clone(), encoder, cfg.link_length)
        .with_metrics(Arc::new(OtelMetrics::new()));
    let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(StorageHealthCheck::new(sessions))];

    let shutdown = CancellationToken::new();
    let state = AppState::new(links, checks, cfg.base_path.clone(), shutdown.clone());
    let router = server::router::build(
        state,
        MiddlewareConfig {
            request_timeout: cfg.request_timeout(),
        },
    );

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    store.close().await;
    info!("pwshare stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM, cancelling `shutdown` so in-flight storage
/// calls abort promptly.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
    shutdown.cancel();
}
