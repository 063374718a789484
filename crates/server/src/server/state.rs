//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::health::HealthCheck;
use crate::link::LinkService;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable so that Axum can clone the state for each
/// request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Issues and redeems links.
    pub links: LinkService,
    /// Probes run by `GET /health`.
    pub health_checks: Arc<Vec<Arc<dyn HealthCheck>>>,
    /// Prefix joined with a link to form the URL returned by `POST /link`.
    pub base_path: Arc<String>,
    /// Cancelled when the server begins shutting down; each request works
    /// under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new [`AppState`].
    pub fn new(
        links: LinkService,
        health_checks: Vec<Arc<dyn HealthCheck>>,
        base_path: String,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            links,
            health_checks: Arc::new(health_checks),
            base_path: Arc::new(base_path),
            shutdown,
        }
    }

    /// The URL handed back to the creator of `link`.
    pub fn link_url(&self, link: &str) -> String {
        format!("{}/{}", self.base_path, link)
    }
}
