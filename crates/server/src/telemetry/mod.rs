//! Structured logging, OTLP export, and the metrics port used by the link service.
//!
//! # Telemetry invariants
//!
//! - **No secrets, ciphertext, or key material** in any span attribute,
//!   metric label, or log field.
//! - Log level is configurable via `PSCONFIG_LOG_LEVEL` (default: `info`);
//!   `RUST_LOG` takes precedence when set.

pub mod init;
pub mod metrics;

pub use init::init_telemetry;
pub use metrics::{LinkMetrics, NoopMetrics, OtelMetrics, StorageOp};
