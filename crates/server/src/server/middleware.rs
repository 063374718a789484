//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, and response compression.

use std::time::Duration;

use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for the shared middleware stack.
#[derive(Debug, Clone, Copy)]
pub struct MiddlewareConfig {
    /// Wall-clock limit per request; exceeded requests get `408`.
    pub request_timeout: Duration,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Apply tracing, timeout, and compression to `router`.
pub fn apply<S>(router: axum::Router<S>, cfg: MiddlewareConfig) -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(cfg.request_timeout))
        .layer(CompressionLayer::new())
}
