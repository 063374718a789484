//! Common error types shared across crates.

use thiserror::Error;

/// Classified failure of a link operation.
///
/// Every error raised below the link service is mapped into one of these
/// variants before it reaches a caller. Variants map to HTTP status codes:
/// - [`ServiceError::BadInput`] → 400
/// - [`ServiceError::PasswordNotFound`] → 404
/// - [`ServiceError::Cancelled`] → 503
/// - everything else → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed (unparseable body, empty link).
    #[error("bad input: {0}")]
    BadInput(String),

    /// The link generator rejected its parameters.
    #[error("randomizer failure: {0}")]
    RandomizerFailure(String),

    /// The secret could not be encrypted.
    #[error("encode failure: {0}")]
    EncodeFailure(String),

    /// A stored ciphertext could not be decrypted: corruption or key mismatch.
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// A storage session could not be opened.
    #[error("storage init failure: {0}")]
    StorageInitFailure(String),

    /// A storage lookup failed for a reason other than a missing record.
    #[error("storage read failure: {0}")]
    StorageReadFailure(String),

    /// A storage insert failed for a reason other than a duplicate link.
    #[error("storage write failure: {0}")]
    StorageWriteFailure(String),

    /// No secret is stored under the requested link.
    #[error("password not found")]
    PasswordNotFound,

    /// The caller (or the process) cancelled the operation before it finished.
    #[error("operation cancelled")]
    Cancelled,

    /// An unclassified internal error.
    #[error("internal failure: {0}")]
    InternalFailure(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadInput(_) => 400,
            ServiceError::PasswordNotFound => 404,
            ServiceError::Cancelled => 503,
            ServiceError::RandomizerFailure(_)
            | ServiceError::EncodeFailure(_)
            | ServiceError::DecodeFailure(_)
            | ServiceError::StorageInitFailure(_)
            | ServiceError::StorageReadFailure(_)
            | ServiceError::StorageWriteFailure(_)
            | ServiceError::InternalFailure(_) => 500,
        }
    }

    /// Short machine-readable code used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadInput(_) => "bad_input",
            ServiceError::RandomizerFailure(_) => "randomizer_failure",
            ServiceError::EncodeFailure(_) => "encode_failure",
            ServiceError::DecodeFailure(_) => "decode_failure",
            ServiceError::StorageInitFailure(_) => "storage_init_failure",
            ServiceError::StorageReadFailure(_) => "storage_read_failure",
            ServiceError::StorageWriteFailure(_) => "storage_write_failure",
            ServiceError::PasswordNotFound => "password_not_found",
            ServiceError::Cancelled => "cancelled",
            ServiceError::InternalFailure(_) => "internal_failure",
        }
    }

    /// Message that is safe to return to callers.
    ///
    /// Client errors echo their detail; server-side failures collapse to a
    /// generic sentence so storage or crypto internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::BadInput(_) | ServiceError::PasswordNotFound | ServiceError::Cancelled => {
                self.to_string()
            }
            _ => "internal error".to_owned(),
        }
    }
}
