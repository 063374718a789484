//! Persistence of secret records, keyed by link.
//!
//! # Responsibilities
//!
//! - Insert new records, reporting a duplicate link as the distinct
//!   [`StorageError::UniqueViolation`] so the caller can retry.
//! - Look records up by link, reporting absence as [`StorageError::NotFound`].
//!
//! # Module invariants
//!
//! - **Scoped sessions.** Every operation runs on a [`Session`] obtained from
//!   [`SessionFactory::open`] for that call alone. Dropping the session
//!   releases its connection, on error paths included.
//! - **No driver errors escape.** Backend failures are flattened into
//!   [`StorageError`] here; nothing above this module sees `sqlx` types.
//! - Records are never updated or deleted.

pub mod sql;

pub use sql::{SqlStore, StoreOptions};

use async_trait::async_trait;
use thiserror::Error;

/// A record as stored, including its storage-assigned key.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SecretRecord {
    /// Storage primary key. Never exposed outside the service.
    pub id: i64,
    /// Public link identifier; unique across all records.
    pub link: String,
    /// Base64 ciphertext of the secret.
    #[sqlx(rename = "password")]
    pub ciphertext: String,
}

/// A record about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSecretRecord {
    /// Candidate link; may collide with an existing record.
    pub link: String,
    /// Base64 ciphertext of the secret.
    pub ciphertext: String,
}

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record with the same link already exists. Retryable.
    #[error("link already exists")]
    UniqueViolation,

    /// No record matches the requested link.
    #[error("record not found")]
    NotFound,

    /// The configured provider id names no known backend.
    #[error("unsupported storage provider: {0}")]
    UnsupportedProvider(String),

    /// Any other backend failure: connectivity, schema, disk.
    #[error("storage error: {0}")]
    Unknown(String),
}

impl StorageError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::UniqueViolation => "unique_violation",
            StorageError::NotFound => "not_found",
            StorageError::UnsupportedProvider(_) => "unsupported_provider",
            StorageError::Unknown(_) => "unknown_error",
        }
    }
}

/// Opens storage sessions. One session serves exactly one service call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Acquire a session. The returned session releases its resources on drop.
    async fn open(&self) -> Result<Box<dyn Session>, StorageError>;
}

/// A single acquired connection to the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Session: Send {
    /// Persist a new record.
    ///
    /// # Errors
    ///
    /// [`StorageError::UniqueViolation`] if the link is taken,
    /// [`StorageError::Unknown`] for every other failure.
    async fn insert(&mut self, record: &NewSecretRecord) -> Result<(), StorageError>;

    /// Fetch the record stored under `link`.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if there is none,
    /// [`StorageError::Unknown`] for every other failure.
    async fn find_by_link(&mut self, link: &str) -> Result<SecretRecord, StorageError>;

    /// Round-trip a trivial query to prove the backend is reachable.
    async fn ping(&mut self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_distinct() {
        let kinds = [
            StorageError::UniqueViolation.kind(),
            StorageError::NotFound.kind(),
            StorageError::UnsupportedProvider("x".into()).kind(),
            StorageError::Unknown("x".into()).kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }
}
