//! Property tests for the decryption pipeline.

use std::sync::OnceLock;

use proptest::prelude::*;

use custody::{open_document, CustodyError, DocumentId, Identity, IdentityId, KeyGrant};
use custody_core::{
    derive_kek, encrypt, wrap_private_key, wrap_with_kek, ContentKey, IdentityKeyPair, Salt,
};
use custody_testkit::generators::{password, plaintext, salt};

fn keypair() -> &'static IdentityKeyPair {
    static PAIR: OnceLock<IdentityKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| IdentityKeyPair::generate().unwrap())
}

fn owner(password: &[u8], salt: Salt) -> Identity {
    let kek = derive_kek(password, &salt).unwrap();
    let pair = keypair();
    Identity {
        id: IdentityId::new("owner"),
        auth_salt: Salt::generate(),
        encryption_salt: salt,
        public_key: pair.public.clone(),
        wrapped_private_key: wrap_private_key(&pair.private, &kek).unwrap(),
    }
}

fn without_trailing_zeros(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn test_owner_round_trip(pw in password(), salt in salt(), pt in plaintext(4096)) {
        let identity = owner(&pw, salt);
        let kek = derive_kek(&pw, &identity.encryption_salt).unwrap();
        let key = ContentKey::generate();
        let grant = KeyGrant::new(
            DocumentId::new("doc"),
            identity.id.clone(),
            wrap_with_kek(&key, &kek).unwrap(),
        );
        let ciphertext = encrypt(&pt, &key).unwrap();

        prop_assert_eq!(open_document(&pw, &identity, &grant, &ciphertext).unwrap(), pt);
    }

    #[test]
    fn test_other_password_fails(pw in password(), other in password(), salt in salt()) {
        // HMAC zero-pads short keys, so trailing zero bytes do not change the KEK.
        prop_assume!(without_trailing_zeros(&pw) != without_trailing_zeros(&other));
        let identity = owner(&pw, salt);
        let kek = derive_kek(&pw, &identity.encryption_salt).unwrap();
        let key = ContentKey::generate();
        let grant = KeyGrant::new(
            DocumentId::new("doc"),
            identity.id.clone(),
            wrap_with_kek(&key, &kek).unwrap(),
        );
        let ciphertext = encrypt(b"secret", &key).unwrap();

        prop_assert!(matches!(
            open_document(&other, &identity, &grant, &ciphertext),
            Err(CustodyError::AuthenticationFailure)
        ));
    }
}
