//! Access delegation: re-wrapping a document key for a grantee.
//!
//! A grant moves through these stages:
//!
//! ```text
//! Requested -> KeyUnwrapped -> KeyRewrapped -> GrantEmitted -> Confirmed
//!     \______________\______________\______________\---------> Failed
//! ```
//!
//! The content key is in plaintext only inside [`rewrap_for_grantee`], which
//! is synchronous, so no key material is ever held across an `.await`.

use std::fmt;

use tracing::instrument;

use custody_core::{
    derive_kek, unwrap_with_kek, wrap_with_public_key, DocumentId, Identity, IdentityId,
    IdentityPublicKey, KeyGrant, WrappedKey,
};
use custody_ledger::{Ledger, TransactionReceipt};
use custody_store::{BlobStore, KeyStore, PutResult};

use crate::kernel::Custody;
use crate::error::{CustodyError, Result};

/// Progress of a single grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantStage {
    Requested,
    KeyUnwrapped,
    KeyRewrapped,
    GrantEmitted,
    Confirmed,
    Failed,
}

impl GrantStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::KeyUnwrapped => "key_unwrapped",
            Self::KeyRewrapped => "key_rewrapped",
            Self::GrantEmitted => "grant_emitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GrantStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(stage: GrantStage) {
    tracing::debug!(stage = %stage, "grant stage");
}

/// How the ledger side of a grant was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantStatus {
    /// A new ledger transaction recorded the relationship.
    Recorded(TransactionReceipt),
    /// The ledger already held the relationship; nothing was recorded.
    AlreadyGranted,
    /// The grantee is the owner; the owner's own grant was returned as is.
    OwnGrant,
}

/// Result of a successful grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantOutcome {
    /// The grant now held by the grantee.
    pub grant: KeyGrant,
    pub status: GrantStatus,
}

/// Result of a revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeOutcome {
    /// Whether a grant was deleted. False when it was already gone.
    pub grant_removed: bool,
    /// Present when the ledger relationship was revoked by this call.
    pub ledger_receipt: Option<TransactionReceipt>,
}

/// Re-wrap an owner's content key for a grantee.
///
/// Derives the owner's KEK, unwraps the owner's KEK-wrapped content key and
/// wraps it under `grantee_public_key`. The plaintext key is dropped before
/// returning. A wrong password fails before anything is produced.
pub fn rewrap_for_grantee(
    owner_password: &[u8],
    owner: &Identity,
    grantee_public_key: &IdentityPublicKey,
    owner_wrapped_key: &WrappedKey,
) -> custody_core::Result<WrappedKey> {
    let kek = derive_kek(owner_password, &owner.encryption_salt)?;
    let content_key = unwrap_with_kek(owner_wrapped_key, &kek)?;
    drop(kek);
    enter(GrantStage::KeyUnwrapped);

    let wrapped = wrap_with_public_key(&content_key, grantee_public_key)?;
    drop(content_key);
    Ok(wrapped)
}

impl<S: KeyStore, B: BlobStore, L: Ledger> Custody<S, B, L> {
    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `grantee_id` read access to one of `owner_id`'s documents.
    ///
    /// Writes the grantee's key grant, then records the (owner, grantee)
    /// relationship on the ledger unless it is already there. If the ledger
    /// step fails, a grant inserted by this call is deleted again so the
    /// grantee is left exactly as before.
    #[instrument(skip_all, fields(owner = %owner_id, document = %document_id, grantee = %grantee_id))]
    pub async fn grant_access(
        &self,
        owner_password: &[u8],
        owner_id: &IdentityId,
        document_id: &DocumentId,
        grantee_id: &IdentityId,
    ) -> Result<GrantOutcome> {
        enter(GrantStage::Requested);

        let owner = self.load_identity(owner_id).await?;
        let document = self.load_document(document_id).await?;
        if &document.owner_id != owner_id {
            return Err(CustodyError::KeyNotFound(format!(
                "document {} owned by {}",
                document_id, owner_id
            )));
        }
        let owner_grant = self.load_grant(document_id, owner_id).await?;

        if grantee_id == owner_id {
            return Ok(GrantOutcome {
                grant: owner_grant,
                status: GrantStatus::OwnGrant,
            });
        }

        let grantee_key = self
            .store
            .get_public_key(grantee_id)
            .await?
            .ok_or_else(|| CustodyError::KeyNotFound(format!("public key of {}", grantee_id)))?;

        let wrapped = rewrap_for_grantee(
            owner_password,
            &owner,
            &grantee_key,
            &owner_grant.wrapped_key,
        )
        .map_err(|e| {
            enter(GrantStage::Failed);
            CustodyError::from(e)
        })?;
        enter(GrantStage::KeyRewrapped);

        let grant = KeyGrant::new(document_id.clone(), grantee_id.clone(), wrapped);
        let put = self.store.put_key_grant(&grant).await.map_err(|e| {
            enter(GrantStage::Failed);
            CustodyError::from(e)
        })?;

        match self.settle_on_ledger(owner_id, grantee_id).await {
            Ok(status) => {
                enter(GrantStage::Confirmed);
                tracing::info!(?put, "access granted");
                Ok(GrantOutcome { grant, status })
            }
            Err(e) => {
                enter(GrantStage::Failed);
                if put == PutResult::Inserted {
                    if let Err(undo) = self.store.delete_key_grant(document_id, grantee_id).await {
                        tracing::warn!(error = %undo, "failed to remove grant after ledger failure");
                    }
                }
                Err(e)
            }
        }
    }

    async fn settle_on_ledger(
        &self,
        owner_id: &IdentityId,
        grantee_id: &IdentityId,
    ) -> Result<GrantStatus> {
        if self.ledger.query_access(owner_id, grantee_id).await? {
            enter(GrantStage::GrantEmitted);
            return Ok(GrantStatus::AlreadyGranted);
        }

        let receipt = self.ledger.record_grant(owner_id, grantee_id).await?;
        enter(GrantStage::GrantEmitted);
        tracing::debug!(tx_id = %receipt.tx_id, sequence = receipt.sequence, "grant recorded");

        if self.config.confirm_grant && !self.ledger.query_access(owner_id, grantee_id).await? {
            return Err(CustodyError::Ledger(format!(
                "relationship {} -> {} not visible after tx {}",
                owner_id, grantee_id, receipt.tx_id
            )));
        }

        Ok(GrantStatus::Recorded(receipt))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Revocation
    // ─────────────────────────────────────────────────────────────────────────

    /// Revoke `grantee_id`'s access to one of `owner_id`'s documents.
    ///
    /// Deletes the grantee's key grant. When the grantee holds no other grant
    /// on this owner's documents, the ledger relationship is revoked too.
    /// Revoking again is harmless and retries a ledger revoke that failed.
    ///
    /// A grant on another of the owner's documents may land while the revoke
    /// is in flight. The grantee's grants are checked again once the revoke
    /// is recorded, and the relationship is recorded anew if one appeared, so
    /// the ledger never denies a grantee who still holds a grant.
    #[instrument(skip_all, fields(owner = %owner_id, document = %document_id, grantee = %grantee_id))]
    pub async fn revoke_access(
        &self,
        owner_id: &IdentityId,
        document_id: &DocumentId,
        grantee_id: &IdentityId,
    ) -> Result<RevokeOutcome> {
        let document = self.load_document(document_id).await?;
        if &document.owner_id != owner_id {
            return Err(CustodyError::KeyNotFound(format!(
                "document {} owned by {}",
                document_id, owner_id
            )));
        }
        if grantee_id == owner_id {
            return Err(CustodyError::KeyNotFound(format!(
                "revocable grant of {} for {}",
                document_id, grantee_id
            )));
        }

        let grant_removed = self.store.delete_key_grant(document_id, grantee_id).await?;

        let mut ledger_receipt = None;
        if !self.holds_grant_from(owner_id, grantee_id).await?
            && self.ledger.query_access(owner_id, grantee_id).await?
        {
            let receipt = self.ledger.record_revoke(owner_id, grantee_id).await?;
            tracing::debug!(tx_id = %receipt.tx_id, "revocation recorded");
            ledger_receipt = Some(receipt);

            if self.holds_grant_from(owner_id, grantee_id).await? {
                let regrant = self.ledger.record_grant(owner_id, grantee_id).await?;
                tracing::warn!(
                    tx_id = %regrant.tx_id,
                    "grant landed during revoke, relationship recorded again"
                );
            }
        }

        tracing::info!(grant_removed, ledger = ledger_receipt.is_some(), "access revoked");
        Ok(RevokeOutcome {
            grant_removed,
            ledger_receipt,
        })
    }

    /// Whether `holder_id` still holds a grant on any of `owner_id`'s documents.
    async fn holds_grant_from(&self, owner_id: &IdentityId, holder_id: &IdentityId) -> Result<bool> {
        for grant in self.store.list_holder_grants(holder_id).await? {
            if let Some(document) = self.store.get_document(&grant.document_id).await? {
                if &document.owner_id == owner_id {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
