//! Fault-injecting wrappers around collaborators.
//!
//! Each wrapper forwards to an inner collaborator until a fault switch is
//! flipped. Switches are atomics so they can be toggled through the shared
//! references a `Custody` hands out.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use custody_core::{ContentLocator, Document, DocumentId, Identity, IdentityId, KeyGrant};
use custody_ledger::{Ledger, LedgerAction, LedgerEntry, LedgerError, TransactionReceipt};
use custody_store::{BlobStore, KeyStore, PutResult, StoreError};

/// A ledger that can be told to fail.
#[derive(Default)]
pub struct FlakyLedger<L> {
    inner: L,
    fail_records: AtomicBool,
    fail_queries: AtomicBool,
    swallow_grants: AtomicBool,
    records: AtomicUsize,
}

impl<L: Ledger> FlakyLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            fail_records: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            swallow_grants: AtomicBool::new(false),
            records: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Make `record_grant` and `record_revoke` fail with `Unavailable`.
    pub fn fail_records(&self, fail: bool) {
        self.fail_records.store(fail, Ordering::SeqCst);
    }

    /// Make `query_access` fail with `Unavailable`.
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Acknowledge grants without recording them.
    pub fn swallow_grants(&self, swallow: bool) {
        self.swallow_grants.store(swallow, Ordering::SeqCst);
    }

    /// Number of record calls that reached this ledger, successful or not.
    pub fn record_calls(&self) -> usize {
        self.records.load(Ordering::SeqCst)
    }

    fn check_records(&self) -> custody_ledger::Result<()> {
        self.records.fetch_add(1, Ordering::SeqCst);
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected record failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl<L: Ledger> Ledger for FlakyLedger<L> {
    async fn record_grant(
        &self,
        owner: &IdentityId,
        grantee: &IdentityId,
    ) -> custody_ledger::Result<TransactionReceipt> {
        self.check_records()?;
        if self.swallow_grants.load(Ordering::SeqCst) {
            let entry = LedgerEntry {
                sequence: 0,
                action: LedgerAction::Grant,
                owner: owner.clone(),
                grantee: grantee.clone(),
                recorded_at: 0,
            };
            return entry.receipt();
        }
        self.inner.record_grant(owner, grantee).await
    }

    async fn record_revoke(
        &self,
        owner: &IdentityId,
        grantee: &IdentityId,
    ) -> custody_ledger::Result<TransactionReceipt> {
        self.check_records()?;
        self.inner.record_revoke(owner, grantee).await
    }

    async fn query_access(
        &self,
        owner: &IdentityId,
        grantee: &IdentityId,
    ) -> custody_ledger::Result<bool> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected query failure".into()));
        }
        self.inner.query_access(owner, grantee).await
    }
}

/// A blob store that can be told to fail.
#[derive(Default)]
pub struct FlakyBlobStore<B> {
    inner: B,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl<B: BlobStore> FlakyBlobStore<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl<B: BlobStore> BlobStore for FlakyBlobStore<B> {
    async fn put(&self, bytes: Bytes) -> custody_store::Result<ContentLocator> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        self.inner.put(bytes).await
    }

    async fn get(&self, locator: &ContentLocator) -> custody_store::Result<Option<Bytes>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        self.inner.get(locator).await
    }
}

/// A key store whose document writes can be told to fail.
#[derive(Default)]
pub struct FlakyKeyStore<S> {
    inner: S,
    fail_document_writes: AtomicBool,
}

impl<S: KeyStore> FlakyKeyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_document_writes: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make `put_document` fail with `Unavailable` without touching the inner store.
    pub fn fail_document_writes(&self, fail: bool) {
        self.fail_document_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: KeyStore> KeyStore for FlakyKeyStore<S> {
    async fn put_identity(&self, identity: &Identity) -> custody_store::Result<()> {
        self.inner.put_identity(identity).await
    }

    async fn get_identity(&self, id: &IdentityId) -> custody_store::Result<Option<Identity>> {
        self.inner.get_identity(id).await
    }

    async fn put_document(
        &self,
        document: &Document,
        owner_grant: &KeyGrant,
    ) -> custody_store::Result<()> {
        if self.fail_document_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected document write failure".into()));
        }
        self.inner.put_document(document, owner_grant).await
    }

    async fn get_document(&self, id: &DocumentId) -> custody_store::Result<Option<Document>> {
        self.inner.get_document(id).await
    }

    async fn put_key_grant(&self, grant: &KeyGrant) -> custody_store::Result<PutResult> {
        self.inner.put_key_grant(grant).await
    }

    async fn get_key_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> custody_store::Result<Option<KeyGrant>> {
        self.inner.get_key_grant(document_id, holder_id).await
    }

    async fn delete_key_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> custody_store::Result<bool> {
        self.inner.delete_key_grant(document_id, holder_id).await
    }

    async fn list_holder_grants(
        &self,
        holder_id: &IdentityId,
    ) -> custody_store::Result<Vec<KeyGrant>> {
        self.inner.list_holder_grants(holder_id).await
    }

    async fn list_document_grants(
        &self,
        document_id: &DocumentId,
    ) -> custody_store::Result<Vec<KeyGrant>> {
        self.inner.list_document_grants(document_id).await
    }
}
