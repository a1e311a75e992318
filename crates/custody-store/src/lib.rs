//! # Custody Store
//!
//! Persistence collaborators for Custody: identities, document records and
//! key grants behind [`KeyStore`], ciphertext behind [`BlobStore`], and a
//! one-time [`ChallengeCache`].
//!
//! ## Key Types
//!
//! - [`KeyStore`] - async trait for identity/document/grant records
//! - [`BlobStore`] - async trait for content-addressed ciphertext
//! - [`SqliteKeyStore`] - SQLite-based persistent key store
//! - [`MemoryKeyStore`], [`MemoryBlobStore`] - in-memory stores for tests
//! - [`FsBlobStore`] - blobs as files named by their locator
//!
//! ## Usage
//!
//! ```rust,no_run
//! use custody_store::{BlobStore, FsBlobStore, SqliteKeyStore};
//!
//! async fn example() -> custody_store::Result<()> {
//!     let keys = SqliteKeyStore::open("custody.db")?;
//!     let blobs = FsBlobStore::open("blobs").await?;
//!
//!     let locator = blobs.put(bytes::Bytes::from_static(b"ciphertext")).await?;
//!     assert!(blobs.contains(&locator).await?);
//!     # let _ = keys;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Create-once records**: identities and documents cannot be overwritten
//! - **Keyed grants**: one grant per (document, holder); writes are upserts
//! - **Verified reads**: filesystem blobs are re-hashed against their locator

pub mod challenge;
pub mod error;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use challenge::{Challenge, ChallengeCache, CHALLENGE_NONCE_LEN};
pub use error::{Result, StoreError};
pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryKeyStore};
pub use sqlite::SqliteKeyStore;
pub use traits::{BlobStore, KeyStore, PutResult};
