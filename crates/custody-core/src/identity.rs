//! Identity key pairs.
//!
//! Every identity owns an RSA-2048 key pair used for key transport
//! (OAEP with SHA-256). The private key is stored only in wrapped form:
//! its PKCS#8 DER export sealed under the identity's KEK with the same
//! `nonce || ciphertext || tag` layout as document content. The public
//! key is exported as SubjectPublicKeyInfo DER and is not secret.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

use crate::aead;
use crate::error::{CryptoError, Result};
use crate::kdf::Kek;

/// Modulus size of generated identity keys.
pub const RSA_MODULUS_BITS: usize = 2048;

/// An identity's public key (RSA, OAEP-SHA256 for key transport).
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityPublicKey(RsaPublicKey);

impl IdentityPublicKey {
    /// Export as SubjectPublicKeyInfo DER.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.0
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    /// Parse SubjectPublicKeyInfo DER.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        RsaPublicKey::from_public_key_der(der)
            .map(Self)
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    pub fn to_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_der()?))
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        let der = STANDARD
            .decode(s)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Self::from_der(&der)
    }

    /// Modulus size in bytes; also the length of every OAEP ciphertext
    /// produced under this key.
    pub fn modulus_len(&self) -> usize {
        self.0.size()
    }

    /// Short Blake3 fingerprint of the DER encoding, for logs.
    pub fn fingerprint(&self) -> String {
        match self.to_der() {
            Ok(der) => hex::encode(&blake3::hash(&der).as_bytes()[..8]),
            Err(_) => "unencodable".to_string(),
        }
    }

    pub(crate) fn encrypt_oaep(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.0
            .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), data)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }
}

impl fmt::Debug for IdentityPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityPublicKey({})", self.fingerprint())
    }
}

/// An identity's private key. Exists in memory only for the duration of a
/// single unwrap; the underlying key is zeroized on drop.
pub struct IdentityPrivateKey(RsaPrivateKey);

impl IdentityPrivateKey {
    pub fn public_key(&self) -> IdentityPublicKey {
        IdentityPublicKey(self.0.to_public_key())
    }

    pub(crate) fn decrypt_oaep(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.0
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::AuthenticationFailure)
    }

    fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.0
            .to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        RsaPrivateKey::from_pkcs8_der(der)
            .map(Self)
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }
}

impl fmt::Debug for IdentityPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityPrivateKey(<redacted>)")
    }
}

/// A freshly generated identity key pair.
#[derive(Debug)]
pub struct IdentityKeyPair {
    pub public: IdentityPublicKey,
    pub private: IdentityPrivateKey,
}

impl IdentityKeyPair {
    /// Generate a new RSA-2048 key pair.
    pub fn generate() -> Result<Self> {
        let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, RSA_MODULUS_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = IdentityPublicKey(private.to_public_key());
        Ok(Self {
            public,
            private: IdentityPrivateKey(private),
        })
    }
}

/// A private key sealed under a KEK: `nonce(12) || ciphertext || tag(16)`.
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedPrivateKey(Vec<u8>);

impl WrappedPrivateKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
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

impl fmt::Debug for WrappedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedPrivateKey({} bytes)", self.0.len())
    }
}

/// Seal a private key under a KEK.
pub fn wrap_private_key(private: &IdentityPrivateKey, kek: &Kek) -> Result<WrappedPrivateKey> {
    let der = private.to_pkcs8_der()?;
    aead::seal(kek.as_bytes(), &der).map(WrappedPrivateKey)
}

/// Recover a private key from its wrapped form.
///
/// A wrong KEK, a corrupted blob, or sealed bytes that do not parse as a
/// private key all fail with [`CryptoError::AuthenticationFailure`].
pub fn unwrap_private_key(wrapped: &WrappedPrivateKey, kek: &Kek) -> Result<IdentityPrivateKey> {
    let der = Zeroizing::new(aead::open(kek.as_bytes(), wrapped.as_bytes())?);
    IdentityPrivateKey::from_pkcs8_der(&der).map_err(|_| CryptoError::AuthenticationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aead::{NONCE_LEN, TAG_LEN};
    use crate::kdf::{derive_kek, Salt};

    #[test]
    fn test_wrap_unwrap_private_key() {
        let pair = IdentityKeyPair::generate().unwrap();
        let kek = derive_kek(b"hunter2", &Salt::generate()).unwrap();

        let wrapped = wrap_private_key(&pair.private, &kek).unwrap();
        let recovered = unwrap_private_key(&wrapped, &kek).unwrap();

        assert_eq!(recovered.public_key(), pair.public);
    }

    #[test]
    fn test_wrong_kek_fails() {
        let pair = IdentityKeyPair::generate().unwrap();
        let salt = Salt::generate();
        let kek = derive_kek(b"right", &salt).unwrap();
        let wrong = derive_kek(b"wrong", &salt).unwrap();

        let wrapped = wrap_private_key(&pair.private, &kek).unwrap();
        assert!(matches!(
            unwrap_private_key(&wrapped, &wrong),
            Err(CryptoError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_sealed_non_key_bytes_fail_authentication() {
        let kek = Kek::from_bytes([9u8; 32]);
        let bogus = WrappedPrivateKey::from_bytes(aead::seal(kek.as_bytes(), b"not der").unwrap());
        assert!(matches!(
            unwrap_private_key(&bogus, &kek),
            Err(CryptoError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_wrapped_layout_has_nonce_and_tag() {
        let pair = IdentityKeyPair::generate().unwrap();
        let kek = Kek::from_bytes([3u8; 32]);
        let wrapped = wrap_private_key(&pair.private, &kek).unwrap();
        let der_len = pair.private.to_pkcs8_der().unwrap().len();
        assert_eq!(wrapped.as_bytes().len(), NONCE_LEN + der_len + TAG_LEN);
    }

    #[test]
    fn test_public_key_encodings() {
        let pair = IdentityKeyPair::generate().unwrap();
        assert_eq!(pair.public.modulus_len(), RSA_MODULUS_BITS / 8);

        let b64 = pair.public.to_base64().unwrap();
        assert_eq!(IdentityPublicKey::from_base64(&b64).unwrap(), pair.public);
        assert!(IdentityPublicKey::from_der(b"garbage").is_err());
    }
}
