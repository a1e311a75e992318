//! The Custody kernel: unified API over keys, blobs and the ledger.

use std::sync::Arc;

use bytes::Bytes;
use tracing::instrument;

use custody_core::{
    derive_kek, encrypt, unwrap_private_key, wrap_private_key, wrap_with_kek, Ciphertext,
    ContentKey, ContentLocator, Document, DocumentId, Identity, IdentityId, IdentityKeyPair,
    KeyGrant, Salt, WrappedKey,
};
use custody_ledger::Ledger;
use custody_store::{BlobStore, Challenge, ChallengeCache, KeyStore, StoreError};

use crate::config::CustodyConfig;
use crate::error::{CustodyError, Result};

/// The main Custody struct.
///
/// Holds shared handles to its three collaborators and no mutable
/// cryptographic state, so clones can serve concurrent requests.
pub struct Custody<S: KeyStore, B: BlobStore, L: Ledger> {
    pub(crate) store: Arc<S>,
    pub(crate) blobs: Arc<B>,
    pub(crate) ledger: Arc<L>,
    pub(crate) challenges: Arc<ChallengeCache>,
    pub(crate) config: CustodyConfig,
}

impl<S: KeyStore, B: BlobStore, L: Ledger> Clone for Custody<S, B, L> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            blobs: self.blobs.clone(),
            ledger: self.ledger.clone(),
            challenges: self.challenges.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: KeyStore, B: BlobStore, L: Ledger> Custody<S, B, L> {
    /// Create a kernel that owns its collaborators.
    pub fn new(store: S, blobs: B, ledger: L, config: CustodyConfig) -> Self {
        let challenges = ChallengeCache::new(config.challenge_ttl());
        Self::from_shared(
            Arc::new(store),
            Arc::new(blobs),
            Arc::new(ledger),
            Arc::new(challenges),
            config,
        )
    }

    /// Create a kernel over collaborators shared with other components.
    pub fn from_shared(
        store: Arc<S>,
        blobs: Arc<B>,
        ledger: Arc<L>,
        challenges: Arc<ChallengeCache>,
        config: CustodyConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            ledger,
            challenges,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &CustodyConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new identity protected by `password`.
    ///
    /// Generates fresh salts and an RSA key pair, wraps the private key under
    /// the password-derived KEK and persists the result.
    #[instrument(skip_all, fields(identity = %id))]
    pub async fn register_identity(&self, id: IdentityId, password: &[u8]) -> Result<Identity> {
        let identity = new_identity(id, password)?;
        self.store.put_identity(&identity).await?;

        tracing::info!(
            fingerprint = %identity.public_key.fingerprint(),
            "identity registered"
        );
        Ok(identity)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt and store a new document owned by `owner_id`.
    ///
    /// The owner's password is checked against the wrapped private key
    /// before anything is written. A document id can be uploaded once. The
    /// document record and the owner's grant are committed together, so a
    /// failed upload leaves the id free for a retry.
    #[instrument(skip_all, fields(owner = %owner_id, document = %document_id))]
    pub async fn upload_document(
        &self,
        owner_password: &[u8],
        owner_id: &IdentityId,
        document_id: DocumentId,
        plaintext: &[u8],
        content_type: Option<String>,
    ) -> Result<Document> {
        let owner = self.load_identity(owner_id).await?;
        if self.store.get_document(&document_id).await?.is_some() {
            return Err(StoreError::Conflict(format!("document {}", document_id)).into());
        }

        let (ciphertext, owner_key) = seal_document(owner_password, &owner, plaintext)?;
        let locator = self.blobs.put(Bytes::from(ciphertext.into_bytes())).await?;

        let document = Document {
            id: document_id,
            owner_id: owner_id.clone(),
            locator,
            content_type,
        };
        let owner_grant = KeyGrant::new(document.id.clone(), owner_id.clone(), owner_key);
        self.store.put_document(&document, &owner_grant).await?;

        tracing::info!(locator = %document.locator, len = plaintext.len(), "document uploaded");
        Ok(document)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Challenges
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a one-time challenge for a registered identity.
    pub async fn issue_challenge(&self, identity_id: &IdentityId) -> Result<Challenge> {
        self.load_identity(identity_id).await?;
        Ok(self.challenges.issue(identity_id)?)
    }

    /// Consume a challenge. True only once per issued nonce, before expiry.
    pub fn consume_challenge(&self, identity_id: &IdentityId, nonce: &[u8]) -> Result<bool> {
        Ok(self.challenges.consume(identity_id, nonce)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) async fn load_identity(&self, id: &IdentityId) -> Result<Identity> {
        self.store
            .get_identity(id)
            .await?
            .ok_or_else(|| CustodyError::KeyNotFound(format!("identity {}", id)))
    }

    pub(crate) async fn load_document(&self, id: &DocumentId) -> Result<Document> {
        self.store
            .get_document(id)
            .await?
            .ok_or_else(|| CustodyError::KeyNotFound(format!("document {}", id)))
    }

    pub(crate) async fn load_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> Result<KeyGrant> {
        self.store
            .get_key_grant(document_id, holder_id)
            .await?
            .ok_or_else(|| {
                CustodyError::KeyNotFound(format!("grant of {} for {}", document_id, holder_id))
            })
    }

    pub(crate) async fn fetch_ciphertext(&self, locator: &ContentLocator) -> Result<Ciphertext> {
        let bytes = self
            .blobs
            .get(locator)
            .await?
            .ok_or_else(|| CustodyError::Transport(format!("blob {} not found", locator)))?;
        Ok(Ciphertext::from_bytes(bytes.to_vec()))
    }
}

/// Build a fresh identity: salts, key pair and KEK-wrapped private key.
fn new_identity(id: IdentityId, password: &[u8]) -> custody_core::Result<Identity> {
    let encryption_salt = Salt::generate();
    let kek = derive_kek(password, &encryption_salt)?;
    let pair = IdentityKeyPair::generate()?;
    let wrapped_private_key = wrap_private_key(&pair.private, &kek)?;

    Ok(Identity {
        id,
        auth_salt: Salt::generate(),
        encryption_salt,
        public_key: pair.public,
        wrapped_private_key,
    })
}

/// Encrypt a document under a fresh content key and wrap that key for its
/// owner. Fails with an authentication error if `password` does not open the
/// owner's private key.
fn seal_document(
    password: &[u8],
    owner: &Identity,
    plaintext: &[u8],
) -> custody_core::Result<(Ciphertext, WrappedKey)> {
    let kek = derive_kek(password, &owner.encryption_salt)?;
    unwrap_private_key(&owner.wrapped_private_key, &kek)?;

    let content_key = ContentKey::generate();
    let ciphertext = encrypt(plaintext, &content_key)?;
    let wrapped = wrap_with_kek(&content_key, &kek)?;
    Ok((ciphertext, wrapped))
}
