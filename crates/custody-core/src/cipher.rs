//! Document content encryption.
//!
//! Each document gets its own random 256-bit content key, generated once at
//! upload and never derived from anything else. A fresh content key per
//! document plus a fresh random nonce per encryption keeps (key, nonce)
//! pairs unique without a counter.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{self, KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::error::{CryptoError, Result};

/// A per-document symmetric content key. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; KEY_LEN]);

impl ContentKey {
    /// Generate a new random content key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Rebuild a key from unwrapped material. Anything other than exactly
    /// 32 bytes is treated as a failed unwrap.
    pub(crate) fn from_unwrapped(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::AuthenticationFailure)?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// Encrypted document bytes: `nonce(12) || ciphertext || tag(16)`.
#[derive(Clone, PartialEq, Eq)]
pub struct Ciphertext(Vec<u8>);

impl Ciphertext {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// The nonce prefix, if the artifact is long enough to carry one.
    pub fn nonce(&self) -> Option<&[u8]> {
        self.0.get(..NONCE_LEN)
    }

    /// Length of the plaintext this ciphertext decrypts to.
    pub fn plaintext_len(&self) -> usize {
        self.0.len().saturating_sub(NONCE_LEN + TAG_LEN)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        STANDARD
            .decode(s)
            .map(Self)
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({} bytes)", self.0.len())
    }
}

/// Encrypt document bytes under a content key with a fresh random nonce.
pub fn encrypt(plaintext: &[u8], key: &ContentKey) -> Result<Ciphertext> {
    aead::seal(key.as_bytes(), plaintext).map(Ciphertext)
}

/// Encrypt with an explicit nonce. For reproducible vectors only.
pub fn encrypt_with_nonce(
    plaintext: &[u8],
    key: &ContentKey,
    nonce: &[u8; NONCE_LEN],
) -> Result<Ciphertext> {
    aead::seal_with_nonce(key.as_bytes(), nonce, plaintext).map(Ciphertext)
}

/// Decrypt document bytes. Never returns partial plaintext.
pub fn decrypt(ciphertext: &Ciphertext, key: &ContentKey) -> Result<Vec<u8>> {
    aead::open(key.as_bytes(), ciphertext.as_bytes())
}
