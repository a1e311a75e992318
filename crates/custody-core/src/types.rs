//! Data model for Custody.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::{IdentityPublicKey, WrappedPrivateKey};
use crate::kdf::Salt;
use crate::wrap::{WrapMethod, WrappedKey};

/// Identifier of an identity (a user or service account).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityId(pub String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityId({})", self.0)
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an uploaded document.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 32-byte content address, computed as Blake3(ciphertext bytes).
///
/// Two uploads of identical ciphertext share a locator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentLocator(pub [u8; 32]);

impl ContentLocator {
    /// Compute the locator of the given bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentLocator({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A registered identity.
///
/// `encryption_salt` is combined with the live password to derive the
/// identity's KEK. `auth_salt` belongs to the password verifier and is never
/// used for key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: IdentityId,
    pub auth_salt: Salt,
    pub encryption_salt: Salt,
    pub public_key: IdentityPublicKey,
    pub wrapped_private_key: WrappedPrivateKey,
}

/// An uploaded document. The ciphertext itself lives in content-addressed
/// storage under `locator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner_id: IdentityId,
    pub locator: ContentLocator,
    pub content_type: Option<String>,
}

/// A holder's wrapped copy of a document's content key.
///
/// Exactly one grant exists per (document, holder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGrant {
    pub document_id: DocumentId,
    pub holder_id: IdentityId,
    pub wrapped_key: WrappedKey,
}

impl KeyGrant {
    pub fn new(document_id: DocumentId, holder_id: IdentityId, wrapped_key: WrappedKey) -> Self {
        Self {
            document_id,
            holder_id,
            wrapped_key,
        }
    }

    /// How the content key in this grant was wrapped.
    pub fn wrap_method(&self) -> WrapMethod {
        self.wrapped_key.method()
    }
}
