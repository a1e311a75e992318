//! # Custody Ledger
//!
//! The ledger collaborator: an external, authoritative record of which
//! owner has granted access to which grantee.
//!
//! ## Key Types
//!
//! - [`Ledger`] - async trait implemented by ledger backends
//! - [`TransactionReceipt`] - acknowledgement of a recorded transaction
//! - [`LedgerEntry`] - a canonical, hashable ledger record
//! - [`MemoryLedger`] - in-memory ledger for tests
//!
//! A transaction id is the Blake3 hash of the entry's canonical CBOR bytes.

pub mod error;
pub mod ledger;
pub mod receipt;

pub use error::{LedgerError, Result};
pub use ledger::memory::MemoryLedger;
pub use ledger::Ledger;
pub use receipt::{LedgerAction, LedgerEntry, TransactionReceipt, TxId};
