//! Error types for the Custody kernel.
//!
//! The kernel surfaces exactly four failure kinds. Payloads carry
//! identifiers and collaborator messages only, never passwords or key bytes.

use custody_core::CryptoError;
use custody_ledger::LedgerError;
use custody_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Custody operations.
#[derive(Debug, Error)]
pub enum CustodyError {
    /// Wrong password, or a corrupted or mismatched wrapped artifact.
    #[error("authentication failure")]
    AuthenticationFailure,

    /// A referenced identity, document, public key or grant does not exist.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A storage collaborator failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The ledger failed or rejected a transaction.
    #[error("ledger failure: {0}")]
    Ledger(String),
}

impl CustodyError {
    /// Whether the caller may retry the same operation.
    ///
    /// Cryptographic failures never change on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Ledger(_))
    }
}

impl From<CryptoError> for CustodyError {
    fn from(_: CryptoError) -> Self {
        Self::AuthenticationFailure
    }
}

impl From<StoreError> for CustodyError {
    fn from(e: StoreError) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<LedgerError> for CustodyError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e.to_string())
    }
}

/// Result type for Custody operations.
pub type Result<T> = std::result::Result<T, CustodyError>;
