//! Error types for the Custody core.

use thiserror::Error;

/// Errors produced by the cryptographic primitives.
///
/// None of the variants carry key material or passwords.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Authenticated decryption failed: wrong key, wrong password,
    /// corrupted artifact, or an artifact of a different wrap method.
    #[error("authentication failure")]
    AuthenticationFailure,

    #[error("invalid salt length: {0} bytes (expected 16..=64)")]
    InvalidSalt(usize),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
