//! Filesystem blob store.
//!
//! Each blob is a file named by the hex of its locator under a root
//! directory. Writes go to a temporary file first and are renamed into
//! place, so a reader never observes a partial blob.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use rand::RngCore;

use custody_core::ContentLocator;

use crate::error::{Result, StoreError};
use crate::traits::BlobStore;

/// Content-addressed blob store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if missing) a blob directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, locator: &ContentLocator) -> PathBuf {
        self.root.join(locator.to_hex())
    }

    fn temp_path(&self, locator: &ContentLocator) -> PathBuf {
        let mut suffix = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut suffix);
        self.root
            .join(format!(".{}.{}.tmp", locator.to_hex(), hex::encode(suffix)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bytes: Bytes) -> Result<ContentLocator> {
        let locator = ContentLocator::of(&bytes);
        let path = self.blob_path(&locator);

        if tokio::fs::try_exists(&path).await? {
            return Ok(locator);
        }

        let temp = self.temp_path(&locator);
        tokio::fs::write(&temp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::trace!(locator = %locator, len = bytes.len(), "stored blob");
        Ok(locator)
    }

    async fn get(&self, locator: &ContentLocator) -> Result<Option<Bytes>> {
        let bytes = match tokio::fs::read(self.blob_path(locator)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if ContentLocator::of(&bytes) != *locator {
            return Err(StoreError::InvalidData(format!(
                "blob {} does not match its locator",
                locator
            )));
        }

        Ok(Some(Bytes::from(bytes)))
    }

    async fn contains(&self, locator: &ContentLocator) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.blob_path(locator)).await?)
    }
}
