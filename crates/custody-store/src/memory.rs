//! In-memory implementations of the store traits.
//!
//! These are primarily for testing. They have the same semantics as the
//! SQLite store but keep everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use custody_core::{ContentLocator, Document, DocumentId, Identity, IdentityId, KeyGrant};

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, KeyStore, PutResult};

/// In-memory key store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryKeyStore {
    inner: RwLock<MemoryKeyStoreInner>,
}

#[derive(Default)]
struct MemoryKeyStoreInner {
    identities: HashMap<IdentityId, Identity>,
    documents: HashMap<DocumentId, Document>,
    /// Grants keyed by (document, holder); BTreeMap keeps listings ordered.
    grants: BTreeMap<(DocumentId, IdentityId), KeyGrant>,
}

impl MemoryKeyStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored grants, across all documents.
    pub fn grant_count(&self) -> usize {
        self.inner.read().map(|inner| inner.grants.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryKeyStoreInner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryKeyStoreInner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn put_identity(&self, identity: &Identity) -> Result<()> {
        let mut inner = self.write()?;
        if inner.identities.contains_key(&identity.id) {
            return Err(StoreError::Conflict(format!("identity {}", identity.id)));
        }
        inner.identities.insert(identity.id.clone(), identity.clone());
        Ok(())
    }

    async fn get_identity(&self, id: &IdentityId) -> Result<Option<Identity>> {
        Ok(self.read()?.identities.get(id).cloned())
    }

    async fn put_document(&self, document: &Document, owner_grant: &KeyGrant) -> Result<()> {
        let mut inner = self.write()?;
        if inner.documents.contains_key(&document.id) {
            return Err(StoreError::Conflict(format!("document {}", document.id)));
        }
        inner.documents.insert(document.id.clone(), document.clone());
        inner.grants.insert(
            (owner_grant.document_id.clone(), owner_grant.holder_id.clone()),
            owner_grant.clone(),
        );
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        Ok(self.read()?.documents.get(id).cloned())
    }

    async fn put_key_grant(&self, grant: &KeyGrant) -> Result<PutResult> {
        let mut inner = self.write()?;
        let key = (grant.document_id.clone(), grant.holder_id.clone());
        match inner.grants.insert(key, grant.clone()) {
            Some(_) => Ok(PutResult::Replaced),
            None => Ok(PutResult::Inserted),
        }
    }

    async fn get_key_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> Result<Option<KeyGrant>> {
        let key = (document_id.clone(), holder_id.clone());
        Ok(self.read()?.grants.get(&key).cloned())
    }

    async fn delete_key_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> Result<bool> {
        let key = (document_id.clone(), holder_id.clone());
        Ok(self.write()?.grants.remove(&key).is_some())
    }

    async fn list_holder_grants(&self, holder_id: &IdentityId) -> Result<Vec<KeyGrant>> {
        Ok(self
            .read()?
            .grants
            .values()
            .filter(|g| &g.holder_id == holder_id)
            .cloned()
            .collect())
    }

    async fn list_document_grants(&self, document_id: &DocumentId) -> Result<Vec<KeyGrant>> {
        Ok(self
            .read()?
            .grants
            .range((document_id.clone(), IdentityId::new(""))..)
            .take_while(|((doc, _), _)| doc == document_id)
            .map(|(_, g)| g.clone())
            .collect())
    }
}

/// In-memory content-addressed blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<ContentLocator, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs stored.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Bytes) -> Result<ContentLocator> {
        let locator = ContentLocator::of(&bytes);
        self.blobs
            .write()
            .map_err(|_| StoreError::Unavailable("blob store lock poisoned".into()))?
            .entry(locator)
            .or_insert(bytes);
        Ok(locator)
    }

    async fn get(&self, locator: &ContentLocator) -> Result<Option<Bytes>> {
        Ok(self
            .blobs
            .read()
            .map_err(|_| StoreError::Unavailable("blob store lock poisoned".into()))?
            .get(locator)
            .cloned())
    }
}
