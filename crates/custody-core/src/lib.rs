//! # Custody Core
//!
//! Cryptographic primitives for encrypted document custody: password-derived
//! key-encryption keys, identity key pairs, per-document content encryption,
//! and content-key wrapping.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Hierarchy
//!
//! ```text
//! password + encryption_salt --PBKDF2--> KEK
//!     KEK --AES-GCM--> wrapped private key        (one per identity)
//!     KEK --AES-GCM--> owner's wrapped content key (WrapMethod::Kek)
//! public key --RSA-OAEP--> grantee's wrapped content key (WrapMethod::PublicKey)
//! content key --AES-GCM--> document ciphertext
//! ```
//!
//! ## Layouts
//!
//! Symmetric artifacts are `nonce(12) || ciphertext || tag(16)`. Asymmetric
//! artifacts are raw OAEP ciphertext. Both are base64 for transport.

pub mod aead;
pub mod cipher;
pub mod error;
pub mod identity;
pub mod kdf;
pub mod types;
pub mod wrap;

pub use cipher::{decrypt, encrypt, encrypt_with_nonce, Ciphertext, ContentKey};
pub use error::{CryptoError, Result};
pub use identity::{
    unwrap_private_key, wrap_private_key, IdentityKeyPair, IdentityPrivateKey, IdentityPublicKey,
    WrappedPrivateKey, RSA_MODULUS_BITS,
};
pub use kdf::{derive_kek, Kek, Salt, PBKDF2_ITERATIONS};
pub use types::{ContentLocator, Document, DocumentId, Identity, IdentityId, KeyGrant};
pub use wrap::{
    unwrap_with_kek, unwrap_with_private_key, wrap_with_kek, wrap_with_public_key, WrapMethod,
    WrappedKey,
};
