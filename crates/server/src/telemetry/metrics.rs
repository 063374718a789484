//! Observability port for the link service.
//!
//! The service reports through [`LinkMetrics`]; it never touches a global
//! registry itself. [`NoopMetrics`] is the default and is what tests use.

use std::time::Duration;

use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::{global, KeyValue};

/// Storage operation label for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    /// Opening a session.
    Open,
    /// Inserting a new record.
    Insert,
    /// Looking a record up by link.
    Lookup,
}

impl StorageOp {
    /// Stable label value.
    pub fn as_str(self) -> &'static str {
        match self {
            StorageOp::Open => "open",
            StorageOp::Insert => "new_password",
            StorageOp::Lookup => "get_password",
        }
    }
}

/// Fire-and-forget hooks around link operations.
///
/// Implementations must not block and must not fail.
pub trait LinkMetrics: Send + Sync {
    /// A link was issued.
    fn link_created(&self);
    /// A lookup by link was attempted.
    fn link_lookup(&self);
    /// A candidate link collided and will be regenerated.
    fn unique_violation_retry(&self);
    /// A storage call failed; `kind` is [`StorageError::kind`](crate::storage::StorageError::kind).
    fn storage_error(&self, kind: &'static str);
    /// Wall-clock duration of one storage call.
    fn storage_call(&self, op: StorageOp, elapsed: Duration);
}

/// Discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl LinkMetrics for NoopMetrics {
    fn link_created(&self) {}
    fn link_lookup(&self) {}
    fn unique_violation_retry(&self) {}
    fn storage_error(&self, _kind: &'static str) {}
    fn storage_call(&self, _op: StorageOp, _elapsed: Duration) {}
}

/// Records into the global OpenTelemetry meter provider.
///
/// With no provider installed the global meter is a no-op, so this is safe to
/// construct unconditionally.
pub struct OtelMetrics {
    links_created: Counter<u64>,
    link_lookups: Counter<u64>,
    unique_violations: Counter<u64>,
    storage_errors: Counter<u64>,
    storage_seconds: Histogram<f64>,
}

impl OtelMetrics {
    /// Build the instruments on the `pwshare` meter.
    pub fn new() -> Self {
        let meter = global::meter("pwshare");
        Self {
            links_created: meter
                .u64_counter("pwshare_links_created")
                .with_description("Links issued")
                .init(),
            link_lookups: meter
                .u64_counter("pwshare_link_lookups")
                .with_description("Lookups by link")
                .init(),
            unique_violations: meter
                .u64_counter("pwshare_unique_violation_retries")
                .with_description("Candidate links regenerated after a collision")
                .init(),
            storage_errors: meter
                .u64_counter("pwshare_storage_errors")
                .with_description("Failed storage calls by kind")
                .init(),
            storage_seconds: meter
                .f64_histogram("pwshare_storage_call_seconds")
                .with_description("Storage call latency in seconds")
                .init(),
        }
    }
}

impl Default for OtelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMetrics for OtelMetrics {
    fn link_created(&self) {
        self.links_created.add(1, &[]);
    }

    fn link_lookup(&self) {
        self.link_lookups.add(1, &[]);
    }

    fn unique_violation_retry(&self) {
        self.unique_violations.add(1, &[]);
    }

    fn storage_error(&self, kind: &'static str) {
        self.storage_errors.add(1, &[KeyValue::new("kind", kind)]);
    }

    fn storage_call(&self, op: StorageOp, elapsed: Duration) {
        self.storage_seconds
            .record(elapsed.as_secs_f64(), &[KeyValue::new("op", op.as_str())]);
    }
}
