//! Content-key wrapping.
//!
//! A content key is wrapped in one of two ways, and the method is recorded
//! explicitly next to every artifact instead of being guessed from its
//! length:
//!
//! - [`WrapMethod::Kek`]: AES-256-GCM under the holder's password-derived
//!   KEK, `nonce(12) || ciphertext || tag(16)` (60 bytes for a 32-byte key).
//!   Used for the owner's own grant.
//! - [`WrapMethod::PublicKey`]: RSA-OAEP-SHA256 under the holder's public
//!   key, raw OAEP ciphertext with no nonce prefix (256 bytes for a 2048-bit
//!   modulus). Used for every delegated grant.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::aead;
use crate::cipher::ContentKey;
use crate::error::{CryptoError, Result};
use crate::identity::{IdentityPrivateKey, IdentityPublicKey};
use crate::kdf::Kek;

/// How a content key was wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WrapMethod {
    /// AES-256-GCM under a password-derived KEK.
    Kek = 1,
    /// RSA-OAEP-SHA256 under an identity public key.
    PublicKey = 2,
}

impl WrapMethod {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(WrapMethod::Kek),
            2 => Some(WrapMethod::PublicKey),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            WrapMethod::Kek => "kek",
            WrapMethod::PublicKey => "public_key",
        }
    }
}

impl fmt::Display for WrapMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A wrapped content key, tagged with the method that produced it.
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedKey {
    method: WrapMethod,
    bytes: Vec<u8>,
}

impl WrappedKey {
    /// Reassemble a stored artifact.
    pub fn from_parts(method: WrapMethod, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            method,
            bytes: bytes.into(),
        }
    }

    pub fn method(&self) -> WrapMethod {
        self.method
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Base64 of the artifact bytes. The method travels separately.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn from_base64(method: WrapMethod, s: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Ok(Self { method, bytes })
    }
}

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedKey({}, {} bytes)", self.method, self.bytes.len())
    }
}

/// Wrap a content key under a KEK.
pub fn wrap_with_kek(content_key: &ContentKey, kek: &Kek) -> Result<WrappedKey> {
    let bytes = aead::seal(kek.as_bytes(), content_key.as_bytes())?;
    Ok(WrappedKey {
        method: WrapMethod::Kek,
        bytes,
    })
}

/// Wrap a content key under a recipient's public key.
///
/// OAEP padding is randomized, so wrapping the same key twice (or for two
/// recipients) yields different artifacts.
pub fn wrap_with_public_key(
    content_key: &ContentKey,
    public_key: &IdentityPublicKey,
) -> Result<WrappedKey> {
    let bytes = public_key.encrypt_oaep(content_key.as_bytes())?;
    Ok(WrappedKey {
        method: WrapMethod::PublicKey,
        bytes,
    })
}

/// Inverse of [`wrap_with_kek`].
pub fn unwrap_with_kek(wrapped: &WrappedKey, kek: &Kek) -> Result<ContentKey> {
    if wrapped.method != WrapMethod::Kek {
        return Err(CryptoError::AuthenticationFailure);
    }
    let raw = Zeroizing::new(aead::open(kek.as_bytes(), &wrapped.bytes)?);
    ContentKey::from_unwrapped(&raw)
}

/// Inverse of [`wrap_with_public_key`].
pub fn unwrap_with_private_key(
    wrapped: &WrappedKey,
    private_key: &IdentityPrivateKey,
) -> Result<ContentKey> {
    if wrapped.method != WrapMethod::PublicKey {
        return Err(CryptoError::AuthenticationFailure);
    }
    let raw = private_key.decrypt_oaep(&wrapped.bytes)?;
    ContentKey::from_unwrapped(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aead::{NONCE_LEN, TAG_LEN};
    use crate::identity::IdentityKeyPair;

    #[test]
    fn test_kek_wrap_roundtrip() {
        let kek = Kek::from_bytes([5u8; 32]);
        let key = ContentKey::generate();

        let wrapped = wrap_with_kek(&key, &kek).unwrap();
        assert_eq!(wrapped.method(), WrapMethod::Kek);
        assert_eq!(wrapped.as_bytes().len(), NONCE_LEN + 32 + TAG_LEN);

        let unwrapped = unwrap_with_kek(&wrapped, &kek).unwrap();
        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_public_key_wrap_roundtrip() {
        let pair = IdentityKeyPair::generate().unwrap();
        let key = ContentKey::generate();

        let wrapped = wrap_with_public_key(&key, &pair.public).unwrap();
        assert_eq!(wrapped.method(), WrapMethod::PublicKey);
        assert_eq!(wrapped.as_bytes().len(), pair.public.modulus_len());

        let unwrapped = unwrap_with_private_key(&wrapped, &pair.private).unwrap();
        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_two_recipients_different_artifacts_same_key() {
        let alice = IdentityKeyPair::generate().unwrap();
        let bob = IdentityKeyPair::generate().unwrap();
        let key = ContentKey::generate();

        let for_alice = wrap_with_public_key(&key, &alice.public).unwrap();
        let for_bob = wrap_with_public_key(&key, &bob.public).unwrap();
        assert_ne!(for_alice.as_bytes(), for_bob.as_bytes());

        let a = unwrap_with_private_key(&for_alice, &alice.private).unwrap();
        let b = unwrap_with_private_key(&for_bob, &bob.private).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_rewrap_same_recipient_randomized() {
        let pair = IdentityKeyPair::generate().unwrap();
        let key = ContentKey::generate();
        let w1 = wrap_with_public_key(&key, &pair.public).unwrap();
        let w2 = wrap_with_public_key(&key, &pair.public).unwrap();
        assert_ne!(w1.as_bytes(), w2.as_bytes());
    }

    #[test]
    fn test_wrong_private_key_fails() {
        let alice = IdentityKeyPair::generate().unwrap();
        let mallory = IdentityKeyPair::generate().unwrap();
        let wrapped = wrap_with_public_key(&ContentKey::generate(), &alice.public).unwrap();

        assert!(matches!(
            unwrap_with_private_key(&wrapped, &mallory.private),
            Err(CryptoError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_method_mismatch_is_authentication_failure() {
        let pair = IdentityKeyPair::generate().unwrap();
        let kek = Kek::from_bytes([5u8; 32]);
        let key = ContentKey::generate();

        let kek_wrapped = wrap_with_kek(&key, &kek).unwrap();
        let pk_wrapped = wrap_with_public_key(&key, &pair.public).unwrap();

        assert!(matches!(
            unwrap_with_private_key(&kek_wrapped, &pair.private),
            Err(CryptoError::AuthenticationFailure)
        ));
        assert!(matches!(
            unwrap_with_kek(&pk_wrapped, &kek),
            Err(CryptoError::AuthenticationFailure)
        ));

        // Retagging the bytes does not help: the tag check still rejects them.
        let retagged = WrappedKey::from_parts(WrapMethod::Kek, pk_wrapped.as_bytes());
        assert!(matches!(
            unwrap_with_kek(&retagged, &kek),
            Err(CryptoError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_method_codes() {
        for method in [WrapMethod::Kek, WrapMethod::PublicKey] {
            assert_eq!(WrapMethod::from_u8(method.as_u8()), Some(method));
        }
        assert_eq!(WrapMethod::from_u8(0), None);
    }
}
