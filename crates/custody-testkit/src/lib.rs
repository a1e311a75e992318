//! # Custody Testkit
//!
//! Testing utilities for Custody.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: AES-GCM and ledger encodings with known outputs
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A kernel harness with registered parties
//! - **Faults**: Collaborators that fail on demand
//!
//! ## Golden Vectors
//!
//! ```rust
//! use custody_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Fixtures
//!
//! ```rust,no_run
//! use custody_testkit::fixtures::Harness;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let harness = Harness::new();
//!     let alice = harness.party("alice").await?;
//!     let bob = harness.party("bob").await?;
//!     let doc = harness.upload(&alice, "notes", b"hello").await?;
//!
//!     harness.ledger().fail_records(true);
//!     let result = harness
//!         .custody
//!         .grant_access(&alice.password, &alice.id, &doc.id, &bob.id)
//!         .await;
//!     assert!(result.is_err());
//!     Ok(())
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use faults::{FlakyBlobStore, FlakyKeyStore, FlakyLedger};
pub use fixtures::{Harness, Party, TestCustody};
pub use vectors::{gcm_vectors, hello_scenario, verify_all_vectors, GcmVector};
