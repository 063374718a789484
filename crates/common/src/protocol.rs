//! Request and response types exchanged over the public HTTP API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Link endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /link`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLinkRequest {
    /// The secret to store. Arbitrary UTF-8, may be empty.
    pub password: String,
}

/// Successful response body for `POST /link`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLinkResponse {
    /// `<base_path>/<link>`, ready to hand to the recipient.
    pub url: String,
    /// The bare link identifier.
    pub link: String,
}

/// Successful response body for `GET /pwd/{link}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResponse {
    /// The decrypted secret.
    pub password: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"password_not_found"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.public_message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `true` when every registered check passed.
    pub healthy: bool,
    /// Newline-separated failure reasons; empty when healthy.
    pub reason: String,
}
