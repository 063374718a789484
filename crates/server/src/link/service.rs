//! [`LinkService`]: issues links for secrets and redeems them.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use common::ServiceError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::generator::{LinkGenerator, RandomLinkGenerator};
use crate::crypto::SymmetricEncoder;
use crate::storage::{NewSecretRecord, Session, SessionFactory, StorageError};
use crate::telemetry::{LinkMetrics, NoopMetrics, StorageOp};

/// Orchestrates link creation and redemption.
///
/// Holds no per-request state: every call opens its own storage session and
/// drops it before returning.
#[derive(Clone)]
pub struct LinkService {
    sessions: Arc<dyn SessionFactory>,
    encoder: Arc<SymmetricEncoder>,
    generator: Arc<dyn LinkGenerator>,
    metrics: Arc<dyn LinkMetrics>,
    link_length: usize,
}

impl LinkService {
    /// Create a service issuing links of `link_length` characters, with the
    /// random generator and no-op metrics.
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        encoder: SymmetricEncoder,
        link_length: usize,
    ) -> Self {
        Self {
            sessions,
            encoder: Arc::new(encoder),
            generator: Arc::new(RandomLinkGenerator),
            metrics: Arc::new(NoopMetrics),
            link_length,
        }
    }

    /// Replace the link generator.
    pub fn with_generator(mut self, generator: Arc<dyn LinkGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Replace the metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn LinkMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Store `secret` under a freshly generated link and return the link.
    ///
    /// Candidate links that collide with an existing record are discarded and
    /// regenerated until an insert succeeds or `cancel` fires. Every other
    /// failure is terminal.
    ///
    /// # Errors
    ///
    /// [`ServiceError::EncodeFailure`], [`ServiceError::RandomizerFailure`],
    /// [`ServiceError::StorageInitFailure`], [`ServiceError::StorageWriteFailure`],
    /// or [`ServiceError::Cancelled`].
    pub async fn create_link(
        &self,
        secret: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ServiceError> {
        let ciphertext = self.encoder.encode(secret).map_err(|e| {
            error!(error = %e, "failed on encoding");
            ServiceError::EncodeFailure(e.to_string())
        })?;

        let mut candidate = self.candidate()?;
        let mut session = self.open_session(cancel).await?;

        loop {
            if cancel.is_cancelled() {
                warn!("link creation cancelled");
                return Err(ServiceError::Cancelled);
            }

            let record = NewSecretRecord {
                link: candidate,
                ciphertext: ciphertext.clone(),
            };
            let inserted = self
                .timed(StorageOp::Insert, cancel, session.insert(&record))
                .await?;

            match inserted {
                Ok(()) => {
                    self.metrics.link_created();
                    info!("link generated");
                    return Ok(record.link);
                }
                Err(StorageError::UniqueViolation) => {
                    self.metrics.unique_violation_retry();
                    warn!("retry after unique key violation");
                    candidate = self.candidate()?;
                }
                Err(e) => {
                    error!(error = %e, "error on storage insert");
                    return Err(ServiceError::StorageWriteFailure(e.to_string()));
                }
            }
        }
    }

    /// Return the secret stored under `link`.
    ///
    /// Reads are not destructive; the same link can be redeemed repeatedly.
    ///
    /// # Errors
    ///
    /// [`ServiceError::BadInput`] for an empty link,
    /// [`ServiceError::PasswordNotFound`] if nothing is stored under it,
    /// [`ServiceError::StorageInitFailure`], [`ServiceError::StorageReadFailure`],
    /// [`ServiceError::DecodeFailure`], or [`ServiceError::Cancelled`].
    pub async fn get_password(
        &self,
        link: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ServiceError> {
        if link.is_empty() {
            return Err(ServiceError::BadInput("link must not be empty".into()));
        }
        self.metrics.link_lookup();

        let mut session = self.open_session(cancel).await?;
        let found = self
            .timed(StorageOp::Lookup, cancel, session.find_by_link(link))
            .await?;
        drop(session);

        let record = match found {
            Ok(record) => record,
            Err(StorageError::NotFound) => {
                warn!(link, "password not found");
                return Err(ServiceError::PasswordNotFound);
            }
            Err(e) => {
                error!(error = %e, "error on storage lookup");
                return Err(ServiceError::StorageReadFailure(e.to_string()));
            }
        };

        self.encoder.decode(&record.ciphertext).map_err(|e| {
            error!(error = %e, "failed on decoding");
            ServiceError::DecodeFailure(e.to_string())
        })
    }

    /// Open a storage session for the duration of one call.
    async fn open_session(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn Session>, ServiceError> {
        self.timed(StorageOp::Open, cancel, self.sessions.open())
            .await?
            .map_err(|e| {
                error!(error = %e, "failed to open storage session");
                ServiceError::StorageInitFailure(e.to_string())
            })
    }

    fn candidate(&self) -> Result<String, ServiceError> {
        self.generator.generate(self.link_length).map_err(|e| {
            error!(error = %e, length = self.link_length, "error on randomizing");
            ServiceError::RandomizerFailure(e.to_string())
        })
    }

    /// Run a storage call under `cancel`, reporting latency and failures.
    ///
    /// The outer `Err` is cancellation; the inner result is the storage outcome.
    async fn timed<T, F>(
        &self,
        op: StorageOp,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<Result<T, StorageError>, ServiceError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(op = op.as_str(), "storage call cancelled");
                return Err(ServiceError::Cancelled);
            }
            result = call => result,
        };
        self.metrics.storage_call(op, started.elapsed());
        if let Err(e) = &result {
            self.metrics.storage_error(e.kind());
        }
        Ok(result)
    }
}
