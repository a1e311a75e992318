//! Ledger abstraction for access relationships.
//!
//! The ledger is the authoritative list of (owner, grantee) relationships.
//! It knows nothing about keys; it only records that an owner has granted
//! or revoked access for a grantee.

use async_trait::async_trait;

use custody_core::IdentityId;

use crate::error::Result;
use crate::receipt::TransactionReceipt;

/// Ledger trait for recording and querying access relationships.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Record that `owner` granted access to `grantee`.
    async fn record_grant(
        &self,
        owner: &IdentityId,
        grantee: &IdentityId,
    ) -> Result<TransactionReceipt>;

    /// Record that `owner` revoked access from `grantee`.
    async fn record_revoke(
        &self,
        owner: &IdentityId,
        grantee: &IdentityId,
    ) -> Result<TransactionReceipt>;

    /// Whether the relationship is currently recorded.
    async fn query_access(&self, owner: &IdentityId, grantee: &IdentityId) -> Result<bool>;
}

/// A simple in-memory ledger for testing.
///
/// Keeps an append-only list of entries and the set of live relationships.
pub mod memory {
    use super::*;
    use std::collections::HashSet;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tokio::sync::RwLock;

    use crate::error::LedgerError;
    use crate::receipt::{LedgerAction, LedgerEntry};

    #[derive(Default)]
    struct State {
        entries: Vec<LedgerEntry>,
        access: HashSet<(IdentityId, IdentityId)>,
    }

    /// In-memory ledger.
    #[derive(Default)]
    pub struct MemoryLedger {
        state: RwLock<State>,
    }

    impl MemoryLedger {
        pub fn new() -> Self {
            Self::default()
        }

        /// All entries recorded so far, in sequence order.
        pub async fn entries(&self) -> Vec<LedgerEntry> {
            self.state.read().await.entries.clone()
        }

        /// Number of live relationships.
        pub async fn relationship_count(&self) -> usize {
            self.state.read().await.access.len()
        }

        async fn append(
            &self,
            action: LedgerAction,
            owner: &IdentityId,
            grantee: &IdentityId,
        ) -> Result<TransactionReceipt> {
            let mut state = self.state.write().await;
            let key = (owner.clone(), grantee.clone());

            match action {
                LedgerAction::Grant if owner == grantee => {
                    return Err(LedgerError::Rejected(format!(
                        "{} cannot grant access to itself",
                        owner
                    )));
                }
                LedgerAction::Revoke if !state.access.contains(&key) => {
                    return Err(LedgerError::Rejected(format!(
                        "no relationship {} -> {}",
                        owner, grantee
                    )));
                }
                _ => {}
            }

            let entry = LedgerEntry {
                sequence: state.entries.len() as u64 + 1,
                action,
                owner: owner.clone(),
                grantee: grantee.clone(),
                recorded_at: now_millis(),
            };
            let receipt = entry.receipt()?;

            match action {
                LedgerAction::Grant => state.access.insert(key),
                LedgerAction::Revoke => state.access.remove(&key),
            };
            state.entries.push(entry);

            tracing::debug!(
                tx_id = %receipt.tx_id,
                sequence = receipt.sequence,
                ?action,
                "ledger entry recorded"
            );
            Ok(receipt)
        }
    }

    #[async_trait]
    impl Ledger for MemoryLedger {
        async fn record_grant(
            &self,
            owner: &IdentityId,
            grantee: &IdentityId,
        ) -> Result<TransactionReceipt> {
            self.append(LedgerAction::Grant, owner, grantee).await
        }

        async fn record_revoke(
            &self,
            owner: &IdentityId,
            grantee: &IdentityId,
        ) -> Result<TransactionReceipt> {
            self.append(LedgerAction::Revoke, owner, grantee).await
        }

        async fn query_access(&self, owner: &IdentityId, grantee: &IdentityId) -> Result<bool> {
            let key = (owner.clone(), grantee.clone());
            Ok(self.state.read().await.access.contains(&key))
        }
    }

    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryLedger;
    use super::*;
    use crate::error::LedgerError;
    use crate::receipt::LedgerAction;

    fn ids() -> (IdentityId, IdentityId) {
        (IdentityId::new("alice"), IdentityId::new("bob"))
    }

    #[tokio::test]
    async fn test_grant_then_query() {
        let ledger = MemoryLedger::new();
        let (alice, bob) = ids();

        assert!(!ledger.query_access(&alice, &bob).await.unwrap());
        let receipt = ledger.record_grant(&alice, &bob).await.unwrap();
        assert_eq!(receipt.sequence, 1);
        assert!(ledger.query_access(&alice, &bob).await.unwrap());
        // Direction matters.
        assert!(!ledger.query_access(&bob, &alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_removes_relationship() {
        let ledger = MemoryLedger::new();
        let (alice, bob) = ids();

        ledger.record_grant(&alice, &bob).await.unwrap();
        let receipt = ledger.record_revoke(&alice, &bob).await.unwrap();
        assert_eq!(receipt.sequence, 2);
        assert!(!ledger.query_access(&alice, &bob).await.unwrap());

        let entries = ledger.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].action, LedgerAction::Revoke);
    }

    #[tokio::test]
    async fn test_revoke_unknown_rejected() {
        let ledger = MemoryLedger::new();
        let (alice, bob) = ids();

        let err = ledger.record_revoke(&alice, &bob).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        assert!(ledger.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_self_grant_rejected() {
        let ledger = MemoryLedger::new();
        let (alice, _) = ids();
        assert!(ledger.record_grant(&alice, &alice).await.is_err());
    }

    #[tokio::test]
    async fn test_receipts_match_entries() {
        let ledger = MemoryLedger::new();
        let (alice, bob) = ids();

        let receipt = ledger.record_grant(&alice, &bob).await.unwrap();
        let entries = ledger.entries().await;
        assert_eq!(entries[0].tx_id().unwrap(), receipt.tx_id);
        assert_eq!(ledger.relationship_count().await, 1);
    }
}
