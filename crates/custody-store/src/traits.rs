//! Collaborator traits: key/record persistence and content-addressed blobs.
//!
//! These traits keep the kernel storage-agnostic. Implementations include
//! SQLite (primary), in-memory (for tests) and a filesystem blob store.

use async_trait::async_trait;
use bytes::Bytes;
use custody_core::{
    ContentLocator, Document, DocumentId, Identity, IdentityId, IdentityPublicKey, KeyGrant,
};

use crate::error::Result;

/// Result of writing a key grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    /// No grant existed for this (document, holder).
    Inserted,
    /// An existing grant for this (document, holder) was overwritten.
    Replaced,
}

/// Persistence for identities, documents and key grants.
///
/// # Design Notes
///
/// - **Create-once records**: identities and documents are immutable;
///   a second `put` for the same id returns `StoreError::Conflict`.
/// - **Atomic uploads**: a document record never exists without its owner's grant.
/// - **Keyed grants**: at most one grant per (document, holder). `put_key_grant`
///   is an upsert, which makes grant retries idempotent.
#[async_trait]
pub trait KeyStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a newly registered identity.
    async fn put_identity(&self, identity: &Identity) -> Result<()>;

    /// Get an identity by id.
    async fn get_identity(&self, id: &IdentityId) -> Result<Option<Identity>>;

    /// Get only the public key of an identity.
    async fn get_public_key(&self, id: &IdentityId) -> Result<Option<IdentityPublicKey>> {
        Ok(self.get_identity(id).await?.map(|identity| identity.public_key))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a newly uploaded document record together with its owner's grant.
    ///
    /// Both are written atomically: either the document and `owner_grant`
    /// exist afterwards, or neither was written. A document id that already
    /// exists returns `StoreError::Conflict` and leaves any existing grant as is.
    async fn put_document(&self, document: &Document, owner_grant: &KeyGrant) -> Result<()>;

    /// Get a document record by id.
    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Key Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace the grant for `(grant.document_id, grant.holder_id)`.
    async fn put_key_grant(&self, grant: &KeyGrant) -> Result<PutResult>;

    /// Get the grant a holder has for a document.
    async fn get_key_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> Result<Option<KeyGrant>>;

    /// Delete a grant. Returns whether one existed.
    async fn delete_key_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> Result<bool>;

    /// All grants held by an identity, ordered by document id.
    async fn list_holder_grants(&self, holder_id: &IdentityId) -> Result<Vec<KeyGrant>>;

    /// All grants for a document, ordered by holder id.
    async fn list_document_grants(&self, document_id: &DocumentId) -> Result<Vec<KeyGrant>>;
}

/// Content-addressed storage for ciphertext.
///
/// The locator of a blob is `ContentLocator::of(bytes)`; storing the same
/// bytes twice is a no-op that returns the same locator.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their locator.
    async fn put(&self, bytes: Bytes) -> Result<ContentLocator>;

    /// Fetch bytes by locator.
    async fn get(&self, locator: &ContentLocator) -> Result<Option<Bytes>>;

    /// Check whether a blob exists.
    async fn contains(&self, locator: &ContentLocator) -> Result<bool> {
        Ok(self.get(locator).await?.is_some())
    }
}
