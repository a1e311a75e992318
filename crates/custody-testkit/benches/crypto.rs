//! Benchmarks for the cryptographic hot paths.
//!
//! Run with: `cargo bench -p custody-testkit --bench crypto`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use custody::rewrap_for_grantee;
use custody_core::{
    decrypt, derive_kek, encrypt, wrap_private_key, wrap_with_kek, wrap_with_public_key,
    ContentKey, Identity, IdentityId, IdentityKeyPair, Salt,
};

fn bench_kdf(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdf");
    group.sample_size(10);

    let salt = Salt::generate();
    group.bench_function("pbkdf2_sha256_100k", |b| {
        b.iter(|| derive_kek(black_box(b"correct horse battery staple"), black_box(&salt)).unwrap());
    });

    group.finish();
}

fn bench_content_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_cipher");
    let key = ContentKey::generate();

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let plaintext = vec![0x5au8; size];
        let ciphertext = encrypt(&plaintext, &key).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", size), &plaintext, |b, pt| {
            b.iter(|| encrypt(black_box(pt), &key).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decrypt", size), &ciphertext, |b, ct| {
            b.iter(|| decrypt(black_box(ct), &key).unwrap());
        });
    }

    group.finish();
}

fn bench_key_wrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_wrap");
    let key = ContentKey::generate();
    let kek = derive_kek(b"pw", &Salt::generate()).unwrap();
    let grantee = IdentityKeyPair::generate().unwrap();

    group.bench_function("kek", |b| {
        b.iter(|| wrap_with_kek(black_box(&key), &kek).unwrap());
    });
    group.bench_function("public_key", |b| {
        b.iter(|| wrap_with_public_key(black_box(&key), &grantee.public).unwrap());
    });

    group.finish();
}

fn bench_rewrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("grant");
    group.sample_size(10);

    let salt = Salt::generate();
    let kek = derive_kek(b"owner-pw", &salt).unwrap();
    let pair = IdentityKeyPair::generate().unwrap();
    let owner = Identity {
        id: IdentityId::new("owner"),
        auth_salt: Salt::generate(),
        encryption_salt: salt,
        public_key: pair.public.clone(),
        wrapped_private_key: wrap_private_key(&pair.private, &kek).unwrap(),
    };
    let owner_key = wrap_with_kek(&ContentKey::generate(), &kek).unwrap();
    let grantee = IdentityKeyPair::generate().unwrap();

    group.bench_function("rewrap_for_grantee", |b| {
        b.iter(|| {
            rewrap_for_grantee(b"owner-pw", &owner, &grantee.public, black_box(&owner_key)).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_kdf, bench_content_cipher, bench_key_wrap, bench_rewrap);
criterion_main!(benches);
