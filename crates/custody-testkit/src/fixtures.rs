//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a kernel over in-memory (or
//! SQLite) collaborators wrapped in fault injectors, and registered parties.

use anyhow::Context;

use custody::{Custody, CustodyConfig};
use custody_core::{Document, DocumentId, Identity, IdentityId};
use custody_ledger::MemoryLedger;
use custody_store::{KeyStore, MemoryBlobStore, MemoryKeyStore, SqliteKeyStore};

use crate::faults::{FlakyBlobStore, FlakyLedger};

/// Blob store used by fixtures.
pub type TestBlobs = FlakyBlobStore<MemoryBlobStore>;

/// Ledger used by fixtures.
pub type TestLedger = FlakyLedger<MemoryLedger>;

/// A kernel over test collaborators.
pub type TestCustody<S = MemoryKeyStore> = Custody<S, TestBlobs, TestLedger>;

/// A registered identity and the password that opens it.
#[derive(Debug, Clone)]
pub struct Party {
    pub id: IdentityId,
    pub password: Vec<u8>,
    pub identity: Identity,
}

/// A kernel plus helpers for registering parties and uploading documents.
pub struct Harness<S: KeyStore = MemoryKeyStore> {
    pub custody: TestCustody<S>,
}

impl Harness<MemoryKeyStore> {
    /// In-memory harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CustodyConfig::default())
    }

    pub fn with_config(config: CustodyConfig) -> Self {
        Self::with_store(MemoryKeyStore::new(), config)
    }
}

impl Default for Harness<MemoryKeyStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness<SqliteKeyStore> {
    /// Harness over an in-memory SQLite key store.
    pub fn sqlite() -> anyhow::Result<Self> {
        let store = SqliteKeyStore::open_memory().context("open in-memory sqlite")?;
        Ok(Self::with_store(store, CustodyConfig::default()))
    }
}

impl<S: KeyStore> Harness<S> {
    pub fn with_store(store: S, config: CustodyConfig) -> Self {
        Self {
            custody: Custody::new(
                store,
                FlakyBlobStore::new(MemoryBlobStore::new()),
                FlakyLedger::new(MemoryLedger::new()),
                config,
            ),
        }
    }

    pub fn ledger(&self) -> &TestLedger {
        self.custody.ledger()
    }

    pub fn blobs(&self) -> &TestBlobs {
        self.custody.blobs()
    }

    /// Register a party whose password is `"<name>-password"`.
    pub async fn party(&self, name: &str) -> anyhow::Result<Party> {
        let id = IdentityId::new(name);
        let password = format!("{}-password", name).into_bytes();
        let identity = self
            .custody
            .register_identity(id.clone(), &password)
            .await
            .with_context(|| format!("register {}", name))?;
        Ok(Party {
            id,
            password,
            identity,
        })
    }

    /// Register several parties.
    pub async fn parties(&self, names: &[&str]) -> anyhow::Result<Vec<Party>> {
        let mut parties = Vec::with_capacity(names.len());
        for name in names {
            parties.push(self.party(name).await?);
        }
        Ok(parties)
    }

    /// Upload a document owned by `owner`.
    pub async fn upload(
        &self,
        owner: &Party,
        document: &str,
        plaintext: &[u8],
    ) -> anyhow::Result<Document> {
        self.custody
            .upload_document(
                &owner.password,
                &owner.id,
                DocumentId::new(document),
                plaintext,
                Some("application/octet-stream".into()),
            )
            .await
            .with_context(|| format!("upload {}", document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_party_and_upload() {
        let harness = Harness::new();
        let alice = harness.party("alice").await.unwrap();
        assert_eq!(alice.password, b"alice-password");

        let doc = harness.upload(&alice, "doc", b"hello").await.unwrap();
        assert_eq!(doc.owner_id, alice.id);
        assert!(!harness.blobs().inner().is_empty());
    }
}
