//! Proptest generators for property-based testing.

use proptest::prelude::*;

use custody_core::{ContentKey, ContentLocator, DocumentId, IdentityId, Salt, WrapMethod};

/// Generate a password of 0 to 64 arbitrary bytes.
pub fn password() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=64)
}

/// Generate a salt with a valid length (16..=64 bytes).
pub fn salt() -> impl Strategy<Value = Salt> {
    prop::collection::vec(any::<u8>(), 16..=64).prop_map(Salt::from_bytes)
}

/// Generate a salt with an invalid length.
pub fn invalid_salt() -> impl Strategy<Value = Salt> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..16),
        prop::collection::vec(any::<u8>(), 65..=128),
    ]
    .prop_map(Salt::from_bytes)
}

/// Generate a content key.
pub fn content_key() -> impl Strategy<Value = ContentKey> {
    any::<[u8; 32]>().prop_map(ContentKey::from_bytes)
}

/// Generate a 96-bit nonce.
pub fn nonce() -> impl Strategy<Value = [u8; 12]> {
    any::<[u8; 12]>()
}

/// Generate document bytes of specified max length.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a content locator.
pub fn locator() -> impl Strategy<Value = ContentLocator> {
    any::<[u8; 32]>().prop_map(ContentLocator::from_bytes)
}

/// Generate an identity id.
pub fn identity_id() -> impl Strategy<Value = IdentityId> {
    "[a-z][a-z0-9_-]{0,31}".prop_map(IdentityId::new)
}

/// Generate a document id.
pub fn document_id() -> impl Strategy<Value = DocumentId> {
    "doc-[a-z0-9]{1,16}".prop_map(DocumentId::new)
}

/// Generate a wrap method.
pub fn wrap_method() -> impl Strategy<Value = WrapMethod> {
    prop_oneof![Just(WrapMethod::Kek), Just(WrapMethod::PublicKey)]
}
