//! Document decryption for owners and grantees.
//!
//! Owner path: KEK -> content key -> plaintext.
//! Grantee path: KEK -> private key -> content key -> plaintext.
//!
//! Whichever step fails, the caller sees one [`CustodyError::AuthenticationFailure`].

use tracing::instrument;

use custody_core::{
    decrypt, derive_kek, unwrap_private_key, unwrap_with_kek, unwrap_with_private_key,
    Ciphertext, ContentKey, ContentLocator, DocumentId, Identity, IdentityId, KeyGrant,
    WrapMethod,
};
use custody_ledger::Ledger;
use custody_store::{BlobStore, KeyStore};

use crate::kernel::Custody;
use crate::error::{CustodyError, Result};

/// Open a document with the holder's password and grant.
///
/// Synchronous; all key material lives and dies inside this call.
pub fn open_document(
    password: &[u8],
    identity: &Identity,
    grant: &KeyGrant,
    ciphertext: &Ciphertext,
) -> Result<Vec<u8>> {
    if grant.holder_id != identity.id {
        return Err(CustodyError::AuthenticationFailure);
    }
    recover_plaintext(password, identity, grant, ciphertext)
        .map_err(|_| CustodyError::AuthenticationFailure)
}

fn recover_plaintext(
    password: &[u8],
    identity: &Identity,
    grant: &KeyGrant,
    ciphertext: &Ciphertext,
) -> custody_core::Result<Vec<u8>> {
    let kek = derive_kek(password, &identity.encryption_salt)?;
    let content_key: ContentKey = match grant.wrap_method() {
        WrapMethod::Kek => unwrap_with_kek(&grant.wrapped_key, &kek)?,
        WrapMethod::PublicKey => {
            let private_key = unwrap_private_key(&identity.wrapped_private_key, &kek)?;
            unwrap_with_private_key(&grant.wrapped_key, &private_key)?
        }
    };
    drop(kek);
    decrypt(ciphertext, &content_key)
}

impl<S: KeyStore, B: BlobStore, L: Ledger> Custody<S, B, L> {
    // ─────────────────────────────────────────────────────────────────────────
    // Decryption
    // ─────────────────────────────────────────────────────────────────────────

    /// Decrypt a document as `identity_id`.
    ///
    /// Missing identities, documents and grants are `KeyNotFound`. With
    /// `enforce_ledger`, a grantee whose relationship is absent from the
    /// ledger is treated as holding no grant.
    #[instrument(skip_all, fields(identity = %identity_id, document = %document_id))]
    pub async fn decrypt_document(
        &self,
        password: &[u8],
        identity_id: &IdentityId,
        document_id: &DocumentId,
    ) -> Result<Vec<u8>> {
        let identity = self.load_identity(identity_id).await?;
        let document = self.load_document(document_id).await?;
        let grant = self.load_grant(document_id, identity_id).await?;

        if self.config.enforce_ledger
            && &document.owner_id != identity_id
            && !self.ledger.query_access(&document.owner_id, identity_id).await?
        {
            tracing::warn!(owner = %document.owner_id, "grant present without ledger relationship");
            return Err(CustodyError::KeyNotFound(format!(
                "grant of {} for {}",
                document_id, identity_id
            )));
        }

        let ciphertext = self.fetch_ciphertext(&document.locator).await?;
        let plaintext = open_document(password, &identity, &grant, &ciphertext)?;
        tracing::debug!(method = %grant.wrap_method(), "document decrypted");
        Ok(plaintext)
    }

    /// Decrypt the blob at `locator` with an explicit identity and grant.
    pub async fn decrypt(
        &self,
        password: &[u8],
        identity: &Identity,
        grant: &KeyGrant,
        locator: &ContentLocator,
    ) -> Result<Vec<u8>> {
        let ciphertext = self.fetch_ciphertext(locator).await?;
        open_document(password, identity, grant, &ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_core::{
        encrypt, wrap_private_key, wrap_with_kek, wrap_with_public_key, IdentityKeyPair, Salt,
        WrappedKey,
    };

    fn identity(name: &str, password: &[u8]) -> Identity {
        let salt = Salt::generate();
        let kek = derive_kek(password, &salt).unwrap();
        let pair = IdentityKeyPair::generate().unwrap();
        Identity {
            id: IdentityId::new(name),
            auth_salt: Salt::generate(),
            encryption_salt: salt,
            public_key: pair.public.clone(),
            wrapped_private_key: wrap_private_key(&pair.private, &kek).unwrap(),
        }
    }

    fn grant_for(holder: &Identity, wrapped: WrappedKey) -> KeyGrant {
        KeyGrant::new(DocumentId::new("doc"), holder.id.clone(), wrapped)
    }

    #[test]
    fn test_owner_path() {
        let owner = identity("owner", b"pw");
        let key = ContentKey::generate();
        let ct = encrypt(b"payload", &key).unwrap();
        let kek = derive_kek(b"pw", &owner.encryption_salt).unwrap();
        let grant = grant_for(&owner, wrap_with_kek(&key, &kek).unwrap());

        assert_eq!(open_document(b"pw", &owner, &grant, &ct).unwrap(), b"payload");
        assert!(matches!(
            open_document(b"wrong", &owner, &grant, &ct),
            Err(CustodyError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_grantee_path() {
        let grantee = identity("grantee", b"their-pw");
        let key = ContentKey::generate();
        let ct = encrypt(b"payload", &key).unwrap();
        let grant = grant_for(&grantee, wrap_with_public_key(&key, &grantee.public_key).unwrap());

        assert_eq!(
            open_document(b"their-pw", &grantee, &grant, &ct).unwrap(),
            b"payload"
        );
        assert!(matches!(
            open_document(b"owner-pw", &grantee, &grant, &ct),
            Err(CustodyError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_foreign_grant_rejected() {
        let alice = identity("alice", b"pw");
        let bob = identity("bob", b"pw");
        let key = ContentKey::generate();
        let ct = encrypt(b"payload", &key).unwrap();
        let grant = grant_for(&bob, wrap_with_public_key(&key, &bob.public_key).unwrap());

        assert!(matches!(
            open_document(b"pw", &alice, &grant, &ct),
            Err(CustodyError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let owner = identity("owner", b"pw");
        let key = ContentKey::generate();
        let mut bytes = encrypt(b"payload", &key).unwrap().into_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let kek = derive_kek(b"pw", &owner.encryption_salt).unwrap();
        let grant = grant_for(&owner, wrap_with_kek(&key, &kek).unwrap());

        assert!(matches!(
            open_document(b"pw", &owner, &grant, &Ciphertext::from_bytes(bytes)),
            Err(CustodyError::AuthenticationFailure)
        ));
    }
}
