//! Readiness checks reported by `GET /health`.

use std::sync::Arc;

use async_trait::async_trait;
use common::protocol::HealthResponse;
use tracing::error;

use crate::storage::SessionFactory;

/// A single dependency probe.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Probe the dependency; `Err` carries a reason safe to show operators.
    async fn check(&self) -> Result<(), String>;
}

/// Opens a session and runs `SELECT 1`.
pub struct StorageHealthCheck {
    sessions: Arc<dyn SessionFactory>,
}

impl StorageHealthCheck {
    /// Probe the backend behind `sessions`.
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl HealthCheck for StorageHealthCheck {
    async fn check(&self) -> Result<(), String> {
        let mut session = self.sessions.open().await.map_err(|e| {
            error!(error = %e, "storage health check could not open a session");
            "storage health check failed".to_owned()
        })?;
        session.ping().await.map_err(|e| {
            error!(error = %e, "error on storage health check");
            "storage health check failed".to_owned()
        })
    }
}

/// Run every check and fold the outcomes into one report.
pub async fn run_all(checks: &[Arc<dyn HealthCheck>]) -> HealthResponse {
    let mut reasons = Vec::new();
    for check in checks {
        if let Err(reason) = check.check().await {
            reasons.push(reason);
        }
    }
    HealthResponse {
        healthy: reasons.is_empty(),
        reason: reasons.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MockSession, MockSessionFactory, Session, StorageError};

    fn factory(ping_ok: bool) -> Arc<dyn SessionFactory> {
        let mut factory = MockSessionFactory::new();
        factory.expect_open().returning(move || {
            let mut session = MockSession::new();
            session.expect_ping().returning(move || {
                if ping_ok {
                    Ok(())
                } else {
                    Err(StorageError::Unknown("server closed the connection".into()))
                }
            });
            Ok(Box::new(session) as Box<dyn Session>)
        });
        Arc::new(factory)
    }

    #[tokio::test]
    async fn healthy_when_all_checks_pass() {
        let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(StorageHealthCheck::new(factory(true)))];
        let report = run_all(&checks).await;
        assert!(report.healthy);
        assert!(report.reason.is_empty());
    }

    #[tokio::test]
    async fn failing_ping_is_reported_without_driver_detail() {
        let checks: Vec<Arc<dyn HealthCheck>> = vec![
            Arc::new(StorageHealthCheck::new(factory(false))),
            Arc::new(StorageHealthCheck::new(factory(false))),
        ];
        let report = run_all(&checks).await;
        assert!(!report.healthy);
        assert_eq!(
            report.reason,
            "storage health check failed\nstorage health check failed"
        );
    }

    #[tokio::test]
    async fn open_failure_is_unhealthy() {
        let mut factory = MockSessionFactory::new();
        factory
            .expect_open()
            .returning(|| Err(StorageError::Unknown("refused".into())));
        let check = StorageHealthCheck::new(Arc::new(factory));
        assert!(check.check().await.is_err());
    }

    #[tokio::test]
    async fn no_checks_is_healthy() {
        assert!(run_all(&[]).await.healthy);
    }
}
