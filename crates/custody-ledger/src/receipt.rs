//! Ledger entries and transaction receipts.
//!
//! Every recorded relationship change is a [`LedgerEntry`]. Its canonical
//! encoding is a CBOR map with small integer keys in ascending order,
//! integers in their shortest form and definite lengths only, so the same
//! entry hashes to the same transaction id everywhere.

use std::fmt;

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use custody_core::IdentityId;

use crate::error::{LedgerError, Result};

/// Entry field keys. Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const SEQUENCE: u64 = 0;
    pub const ACTION: u64 = 1;
    pub const OWNER: u64 = 2;
    pub const GRANTEE: u64 = 3;
    pub const RECORDED_AT: u64 = 4;
}

/// What a ledger entry does to the (owner, grantee) relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LedgerAction {
    Grant = 1,
    Revoke = 2,
}

impl LedgerAction {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Grant),
            2 => Some(Self::Revoke),
            _ => None,
        }
    }
}

/// One append-only ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the ledger, starting at 1.
    pub sequence: u64,
    pub action: LedgerAction,
    pub owner: IdentityId,
    pub grantee: IdentityId,
    /// Unix milliseconds at which the ledger accepted the entry.
    pub recorded_at: i64,
}

impl LedgerEntry {
    /// Canonical CBOR bytes of this entry.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let value = Value::Map(vec![
            (
                Value::Integer(keys::SEQUENCE.into()),
                Value::Integer(self.sequence.into()),
            ),
            (
                Value::Integer(keys::ACTION.into()),
                Value::Integer(self.action.as_u8().into()),
            ),
            (
                Value::Integer(keys::OWNER.into()),
                Value::Text(self.owner.as_str().to_owned()),
            ),
            (
                Value::Integer(keys::GRANTEE.into()),
                Value::Text(self.grantee.as_str().to_owned()),
            ),
            (
                Value::Integer(keys::RECORDED_AT.into()),
                Value::Integer(self.recorded_at.into()),
            ),
        ]);

        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf)
            .map_err(|e| LedgerError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Transaction id: Blake3 of the canonical bytes.
    pub fn tx_id(&self) -> Result<TxId> {
        Ok(TxId(*blake3::hash(&self.canonical_bytes()?).as_bytes()))
    }

    /// Build the receipt handed back to the caller.
    pub fn receipt(&self) -> Result<TransactionReceipt> {
        Ok(TransactionReceipt {
            tx_id: self.tx_id()?,
            sequence: self.sequence,
            recorded_at: self.recorded_at,
        })
    }
}

/// A 32-byte transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Acknowledgement of a recorded ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_id: TxId,
    pub sequence: u64,
    pub recorded_at: i64,
}
