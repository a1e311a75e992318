//! AES-256-GCM sealing with a self-describing layout.
//!
//! Every symmetric artifact in Custody (document ciphertext, KEK-wrapped
//! content key, KEK-wrapped private key) uses the same byte layout:
//!
//! ```text
//! nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use crate::error::{CryptoError, Result};

/// Size of the AES-GCM nonce in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// Size of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Generate a fresh random nonce.
pub fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Seal `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    seal_with_nonce(key, &random_nonce(), plaintext)
}

/// Seal with an explicit nonce.
///
/// Never reuse a nonce with the same key. Only golden vectors call this
/// directly; everything else goes through [`seal`].
pub fn seal_with_nonce(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let sealed = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Open a sealed artifact. Any failure, including a truncated artifact, is
/// an [`CryptoError::AuthenticationFailure`].
pub fn open(key: &[u8; KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::AuthenticationFailure);
    }

    let (nonce, body) = sealed.split_at(NONCE_LEN);
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AuthenticationFailure)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| CryptoError::AuthenticationFailure)
}
