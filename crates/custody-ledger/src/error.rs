//! Error types for the ledger module.

use thiserror::Error;

/// Errors that can occur when talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger refused the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The ledger could not be reached or did not answer.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A ledger entry could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
