//! Symmetric encryption of secrets at rest.
//!
//! This module is intentionally free of storage and HTTP dependencies.
//!
//! # Ciphertext format
//!
//! ```text
//! base64-standard-padded( AES-CFB(key, fixed IV, utf8(secret)) )
//! ```

pub mod cipher;

pub use cipher::{CipherError, SymmetricEncoder};
