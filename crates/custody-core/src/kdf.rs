//! Password-based key derivation.
//!
//! Every identity has an `encryption_salt`. Combined with the identity's
//! password it yields the Key-Encryption-Key (KEK) that protects the
//! identity's private key and its own content-key grants:
//!
//! ```text
//! KEK = PBKDF2-HMAC-SHA256(password, encryption_salt, 100_000 rounds, 32 bytes)
//! ```
//!
//! The iteration count and hash are constants so independently derived
//! KEKs for the same (password, salt) pair are bit-identical. A wrong
//! password is never detected here; it surfaces later as an authentication
//! failure when the KEK is used.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};

/// PBKDF2 iteration count shared by every caller.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of freshly generated salts.
pub const SALT_LEN: usize = 16;

/// Shortest salt accepted for derivation.
pub const MIN_SALT_LEN: usize = 16;

/// Longest salt accepted for derivation.
pub const MAX_SALT_LEN: usize = 64;

/// Length of a derived KEK (256 bits).
pub const KEK_LEN: usize = 32;

/// A per-identity salt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Generate a new random salt of [`SALT_LEN`] bytes.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap existing salt bytes. Length is checked at derivation time.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(&self.0))
    }
}

/// A Key-Encryption-Key derived from a password.
///
/// Used only to wrap other keys, never document content. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Kek([u8; KEK_LEN]);

impl Kek {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEK_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEK_LEN] {
        &self.0
    }
}

impl fmt::Debug for Kek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Kek(<redacted>)")
    }
}

/// Derive the KEK for a password and salt.
///
/// Fails only when the salt length is outside
/// [`MIN_SALT_LEN`]..=[`MAX_SALT_LEN`].
pub fn derive_kek(password: &[u8], salt: &Salt) -> Result<Kek> {
    if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt.len()) {
        return Err(CryptoError::InvalidSalt(salt.len()));
    }

    let mut out = [0u8; KEK_LEN];
    pbkdf2_hmac::<Sha256>(password, salt.as_bytes(), PBKDF2_ITERATIONS, &mut out);
    let kek = Kek(out);
    out.zeroize();
    Ok(kek)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_deterministic() {
        let salt = Salt::from_bytes([7u8; 16]);
        let k1 = derive_kek(b"correct horse", &salt).unwrap();
        let k2 = derive_kek(b"correct horse", &salt).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_different_password_different_kek() {
        let salt = Salt::from_bytes([7u8; 16]);
        let k1 = derive_kek(b"password-a", &salt).unwrap();
        let k2 = derive_kek(b"password-b", &salt).unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_kek() {
        let k1 = derive_kek(b"pw", &Salt::from_bytes([1u8; 16])).unwrap();
        let k2 = derive_kek(b"pw", &Salt::from_bytes([2u8; 16])).unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_salt_length_bounds() {
        assert!(matches!(
            derive_kek(b"pw", &Salt::from_bytes([0u8; 15])),
            Err(CryptoError::InvalidSalt(15))
        ));
        assert!(matches!(
            derive_kek(b"pw", &Salt::from_bytes(vec![0u8; 65])),
            Err(CryptoError::InvalidSalt(65))
        ));
        assert!(derive_kek(b"pw", &Salt::from_bytes(vec![0u8; 64])).is_ok());
    }

    #[test]
    fn test_empty_password_is_not_an_error() {
        assert!(derive_kek(b"", &Salt::generate()).is_ok());
    }

    #[test]
    fn test_generated_salts_unique() {
        let a = Salt::generate();
        let b = Salt::generate();
        assert_eq!(a.len(), SALT_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_kek_debug_redacted() {
        let kek = Kek::from_bytes([0x41; 32]);
        assert_eq!(format!("{kek:?}"), "Kek(<redacted>)");
    }
}
