//! # Custody
//!
//! Encrypted document custody with delegated read access.
//!
//! ## Overview
//!
//! An owner uploads a document encrypted under a fresh content key. The
//! content key is wrapped under the owner's password-derived KEK. Granting
//! access re-wraps that key under the grantee's RSA public key and records
//! the (owner, grantee) relationship on an external ledger. The grantee later
//! opens the document with their own password alone.
//!
//! ## Key Concepts
//!
//! - **Identity**: RSA key pair whose private half is sealed under a KEK
//! - **KeyGrant**: one wrapped content key per (document, holder)
//! - **Ledger**: the authoritative record of who granted access to whom
//!
//! ## Usage
//!
//! ```rust,no_run
//! use custody::{Custody, CustodyConfig};
//! use custody::core::{DocumentId, IdentityId};
//! use custody::ledger::MemoryLedger;
//! use custody::store::{FsBlobStore, SqliteKeyStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let custody = Custody::new(
//!         SqliteKeyStore::open("custody.db")?,
//!         FsBlobStore::open("blobs").await?,
//!         MemoryLedger::new(),
//!         CustodyConfig::default(),
//!     );
//!
//!     let alice = IdentityId::new("alice");
//!     let bob = IdentityId::new("bob");
//!     custody.register_identity(alice.clone(), b"alice-pw").await?;
//!     custody.register_identity(bob.clone(), b"bob-pw").await?;
//!
//!     let doc = DocumentId::new("report");
//!     custody
//!         .upload_document(b"alice-pw", &alice, doc.clone(), b"contents", None)
//!         .await?;
//!     custody.grant_access(b"alice-pw", &alice, &doc, &bob).await?;
//!
//!     let plaintext = custody.decrypt_document(b"bob-pw", &bob, &doc).await?;
//!     assert_eq!(plaintext, b"contents");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `custody::core` - cryptographic primitives and data model
//! - `custody::store` - key store, blob store and challenge cache
//! - `custody::ledger` - ledger trait and in-memory ledger

pub mod config;
pub mod kernel;
pub mod decrypt;
pub mod error;
pub mod grant;

// Re-export component crates
pub use custody_core as core;
pub use custody_ledger as ledger;
pub use custody_store as store;

pub use config::CustodyConfig;
pub use kernel::Custody;
pub use decrypt::open_document;
pub use error::{CustodyError, Result};
pub use grant::{rewrap_for_grantee, GrantOutcome, GrantStage, GrantStatus, RevokeOutcome};

pub use custody_core::{Document, DocumentId, Identity, IdentityId, KeyGrant, WrapMethod};
