//! Link issuance and redemption.
//!
//! # Lifecycle
//!
//! 1. [`LinkService::create_link`] encrypts the secret, draws a candidate link
//!    from the [`LinkGenerator`], and inserts it. A duplicate link is the only
//!    retried failure: a new candidate is drawn and the insert repeated until
//!    it succeeds or the caller cancels.
//! 2. [`LinkService::get_password`] looks the link up and decrypts the stored
//!    ciphertext. Reads do not consume the record.
//!
//! # Invariants
//!
//! - Uniqueness of links is enforced by storage, never pre-checked here.
//! - Plaintext secrets are never handed to storage.

pub mod generator;
pub mod service;

pub use generator::{GeneratorError, LinkGenerator, RandomLinkGenerator};
pub use service::LinkService;
