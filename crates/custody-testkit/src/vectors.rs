//! Golden test vectors for bit-exact verification.
//!
//! The AES-GCM vectors are McGrew and Viega GCM test cases 13 and 14
//! (256-bit zero key, 96-bit zero IV), expressed in Custody's sealed layout
//! `nonce || ciphertext || tag`. The ledger vector pins the canonical CBOR
//! encoding of a grant entry.

use anyhow::{bail, ensure, Context};

use custody_core::{decrypt, encrypt_with_nonce, Ciphertext, ContentKey, CryptoError, IdentityId};
use custody_ledger::{LedgerAction, LedgerEntry};

/// An AES-256-GCM golden vector.
#[derive(Debug, Clone)]
pub struct GcmVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Key (hex, 32 bytes).
    pub key: &'static str,
    /// Nonce (hex, 12 bytes).
    pub nonce: &'static str,
    /// Plaintext (hex).
    pub plaintext: &'static str,
    /// Expected sealed artifact (hex): nonce || ciphertext || tag.
    pub sealed: &'static str,
}

/// All AES-GCM golden vectors.
pub fn gcm_vectors() -> Vec<GcmVector> {
    vec![
        GcmVector {
            name: "GCM test case 13: empty plaintext",
            key: "0000000000000000000000000000000000000000000000000000000000000000",
            nonce: "000000000000000000000000",
            plaintext: "",
            sealed: concat!(
                "000000000000000000000000",
                "530f8afbc74536b9a963b4f1c4cb738b",
            ),
        },
        GcmVector {
            name: "GCM test case 14: one zero block",
            key: "0000000000000000000000000000000000000000000000000000000000000000",
            nonce: "000000000000000000000000",
            plaintext: "00000000000000000000000000000000",
            sealed: concat!(
                "000000000000000000000000",
                "cea7403d4d606b6e074ec5d3baf39d18",
                "d0d1c8a799996bf0265b98b5d48ab919",
            ),
        },
    ]
}

/// Check one GCM vector in both directions.
pub fn verify_gcm_vector(vector: &GcmVector) -> anyhow::Result<()> {
    let key: [u8; 32] = hex::decode(vector.key)?
        .try_into()
        .map_err(|_| anyhow::anyhow!("{}: key must be 32 bytes", vector.name))?;
    let nonce: [u8; 12] = hex::decode(vector.nonce)?
        .try_into()
        .map_err(|_| anyhow::anyhow!("{}: nonce must be 12 bytes", vector.name))?;
    let plaintext = hex::decode(vector.plaintext)?;
    let key = ContentKey::from_bytes(key);

    let sealed = encrypt_with_nonce(&plaintext, &key, &nonce)
        .with_context(|| format!("{}: encrypt", vector.name))?;
    ensure!(
        hex::encode(sealed.as_bytes()) == vector.sealed,
        "{}: sealed bytes mismatch: {}",
        vector.name,
        hex::encode(sealed.as_bytes())
    );

    let expected = Ciphertext::from_bytes(hex::decode(vector.sealed)?);
    let opened = decrypt(&expected, &key).with_context(|| format!("{}: decrypt", vector.name))?;
    ensure!(opened == plaintext, "{}: plaintext mismatch", vector.name);
    Ok(())
}

/// Check every GCM vector.
pub fn verify_all_vectors() -> anyhow::Result<()> {
    for vector in gcm_vectors() {
        verify_gcm_vector(&vector)?;
    }
    Ok(())
}

/// The zero-key `"HELLO"` scenario: a 32-byte zero key and nonce `n1`
/// encrypt `"HELLO"`; the key opens it and any other key is rejected.
pub fn hello_scenario(n1: [u8; 12]) -> anyhow::Result<()> {
    let key = ContentKey::from_bytes([0u8; 32]);
    let c1 = encrypt_with_nonce(b"HELLO", &key, &n1)?;
    ensure!(decrypt(&c1, &key)? == b"HELLO", "HELLO did not round-trip");

    for flip in [0usize, 15, 31] {
        let mut other = [0u8; 32];
        other[flip] = 0x80;
        match decrypt(&c1, &ContentKey::from_bytes(other)) {
            Err(CryptoError::AuthenticationFailure) => {}
            Ok(_) => bail!("key with byte {} flipped opened the ciphertext", flip),
            Err(e) => bail!("unexpected error for flipped byte {}: {}", flip, e),
        }
    }
    Ok(())
}

/// A grant entry with fixed fields.
pub fn ledger_entry_vector() -> LedgerEntry {
    LedgerEntry {
        sequence: 1,
        action: LedgerAction::Grant,
        owner: IdentityId::new("alice"),
        grantee: IdentityId::new("bob"),
        recorded_at: 1_700_000_000_000,
    }
}

/// Canonical bytes of [`ledger_entry_vector`] (hex).
pub const LEDGER_ENTRY_CANONICAL: &str = concat!(
    "a5",               // map(5)
    "00", "01",         // 0: sequence = 1
    "01", "01",         // 1: action = grant
    "02", "65616c696365", // 2: owner = "alice"
    "03", "63626f62",   // 3: grantee = "bob"
    "04", "1b0000018bcfe56800", // 4: recorded_at
);
