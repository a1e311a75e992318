//! SQLite implementation of the KeyStore trait.
//!
//! This is the primary persistence backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use custody_core::{
    ContentLocator, Document, DocumentId, Identity, IdentityId, IdentityPublicKey, KeyGrant,
    Salt, WrapMethod, WrappedKey, WrappedPrivateKey,
};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{KeyStore, PutResult};

/// SQLite-based key store.
///
/// Thread-safe via an internal Mutex. All operations run on the blocking
/// pool so they never stall the async runtime.
#[derive(Clone)]
pub struct SqliteKeyStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

struct IdentityRow {
    identity_id: String,
    auth_salt: Vec<u8>,
    encryption_salt: Vec<u8>,
    public_key: Vec<u8>,
    wrapped_private_key: Vec<u8>,
}

impl IdentityRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identity_id: row.get("identity_id")?,
            auth_salt: row.get("auth_salt")?,
            encryption_salt: row.get("encryption_salt")?,
            public_key: row.get("public_key")?,
            wrapped_private_key: row.get("wrapped_private_key")?,
        })
    }

    fn into_identity(self) -> Result<Identity> {
        let public_key = IdentityPublicKey::from_der(&self.public_key).map_err(|e| {
            StoreError::InvalidData(format!("public key of {}: {}", self.identity_id, e))
        })?;
        Ok(Identity {
            id: IdentityId(self.identity_id),
            auth_salt: Salt::from_bytes(self.auth_salt),
            encryption_salt: Salt::from_bytes(self.encryption_salt),
            public_key,
            wrapped_private_key: WrappedPrivateKey::from_bytes(self.wrapped_private_key),
        })
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let locator: Vec<u8> = row.get("locator")?;
    let locator: [u8; 32] = locator.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(2, "locator".into(), rusqlite::types::Type::Blob)
    })?;
    Ok(Document {
        id: DocumentId(row.get("document_id")?),
        owner_id: IdentityId(row.get("owner_id")?),
        locator: ContentLocator::from_bytes(locator),
        content_type: row.get("content_type")?,
    })
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<KeyGrant> {
    let method: u8 = row.get("wrap_method")?;
    let method = WrapMethod::from_u8(method).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(2, "wrap_method".into(), rusqlite::types::Type::Integer)
    })?;
    let wrapped: Vec<u8> = row.get("wrapped_key")?;
    Ok(KeyGrant::new(
        DocumentId(row.get("document_id")?),
        IdentityId(row.get("holder_id")?),
        WrappedKey::from_parts(method, wrapped),
    ))
}

fn upsert_grant(conn: &Connection, grant: &KeyGrant, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO key_grants (document_id, holder_id, wrap_method, wrapped_key, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(document_id, holder_id) DO UPDATE SET
            wrap_method = excluded.wrap_method,
            wrapped_key = excluded.wrapped_key,
            updated_at = excluded.updated_at",
        params![
            grant.document_id.as_str(),
            grant.holder_id.as_str(),
            grant.wrap_method().as_u8(),
            grant.wrapped_key.as_bytes(),
            now,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    async fn put_identity(&self, identity: &Identity) -> Result<()> {
        let public_key = identity
            .public_key
            .to_der()
            .map_err(|e| StoreError::InvalidData(format!("public key encoding: {}", e)))?;
        let identity = identity.clone();

        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO identities (
                    identity_id, auth_salt, encryption_salt, public_key,
                    wrapped_private_key, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    identity.id.as_str(),
                    identity.auth_salt.as_bytes(),
                    identity.encryption_salt.as_bytes(),
                    public_key,
                    identity.wrapped_private_key.as_bytes(),
                    now_millis(),
                ],
            )?;
            if inserted == 0 {
                return Err(StoreError::Conflict(format!("identity {}", identity.id)));
            }
            Ok(())
        })
        .await
    }

    async fn get_identity(&self, id: &IdentityId) -> Result<Option<Identity>> {
        let id = id.clone();
        let row = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT identity_id, auth_salt, encryption_salt, public_key, wrapped_private_key
                     FROM identities WHERE identity_id = ?1",
                    params![id.as_str()],
                    IdentityRow::from_row,
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;
        row.map(IdentityRow::into_identity).transpose()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    async fn put_document(&self, document: &Document, owner_grant: &KeyGrant) -> Result<()> {
        let document = document.clone();
        let owner_grant = owner_grant.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let now = now_millis();

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO documents (
                    document_id, owner_id, locator, content_type, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    document.id.as_str(),
                    document.owner_id.as_str(),
                    document.locator.as_bytes().as_slice(),
                    document.content_type,
                    now,
                ],
            )?;
            if inserted == 0 {
                // Dropping the transaction rolls it back.
                return Err(StoreError::Conflict(format!("document {}", document.id)));
            }

            upsert_grant(&tx, &owner_grant, now)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT document_id, owner_id, locator, content_type
                 FROM documents WHERE document_id = ?1",
                params![id.as_str()],
                row_to_document,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Key Grants
    // ─────────────────────────────────────────────────────────────────────────

    async fn put_key_grant(&self, grant: &KeyGrant) -> Result<PutResult> {
        let grant = grant.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let existed: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM key_grants WHERE document_id = ?1 AND holder_id = ?2)",
                params![grant.document_id.as_str(), grant.holder_id.as_str()],
                |row| row.get(0),
            )?;
            upsert_grant(&tx, &grant, now_millis())?;
            tx.commit()?;

            Ok(if existed {
                PutResult::Replaced
            } else {
                PutResult::Inserted
            })
        })
        .await
    }

    async fn get_key_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> Result<Option<KeyGrant>> {
        let document_id = document_id.clone();
        let holder_id = holder_id.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT document_id, holder_id, wrap_method, wrapped_key
                 FROM key_grants WHERE document_id = ?1 AND holder_id = ?2",
                params![document_id.as_str(), holder_id.as_str()],
                row_to_grant,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn delete_key_grant(
        &self,
        document_id: &DocumentId,
        holder_id: &IdentityId,
    ) -> Result<bool> {
        let document_id = document_id.clone();
        let holder_id = holder_id.clone();
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM key_grants WHERE document_id = ?1 AND holder_id = ?2",
                params![document_id.as_str(), holder_id.as_str()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_holder_grants(&self, holder_id: &IdentityId) -> Result<Vec<KeyGrant>> {
        let holder_id = holder_id.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT document_id, holder_id, wrap_method, wrapped_key
                 FROM key_grants WHERE holder_id = ?1
                 ORDER BY document_id",
            )?;
            let grants = stmt
                .query_map(params![holder_id.as_str()], row_to_grant)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(grants)
        })
        .await
    }

    async fn list_document_grants(&self, document_id: &DocumentId) -> Result<Vec<KeyGrant>> {
        let document_id = document_id.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT document_id, holder_id, wrap_method, wrapped_key
                 FROM key_grants WHERE document_id = ?1
                 ORDER BY holder_id",
            )?;
            let grants = stmt
                .query_map(params![document_id.as_str()], row_to_grant)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(grants)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_core::{derive_kek, wrap_private_key, IdentityKeyPair};

    fn make_identity(name: &str) -> Identity {
        let pair = IdentityKeyPair::generate().unwrap();
        let salt = Salt::generate();
        let kek = derive_kek(b"password", &salt).unwrap();
        Identity {
            id: IdentityId::new(name),
            auth_salt: Salt::generate(),
            encryption_salt: salt,
            public_key: pair.public.clone(),
            wrapped_private_key: wrap_private_key(&pair.private, &kek).unwrap(),
        }
    }

    fn make_grant(doc: &str, holder: &str, method: WrapMethod, fill: u8) -> KeyGrant {
        KeyGrant::new(
            DocumentId::new(doc),
            IdentityId::new(holder),
            WrappedKey::from_parts(method, vec![fill; 60]),
        )
    }

    #[tokio::test]
    async fn test_identity_roundtrip() {
        let store = SqliteKeyStore::open_memory().unwrap();
        let identity = make_identity("alice");

        store.put_identity(&identity).await.unwrap();
        let loaded = store.get_identity(&identity.id).await.unwrap().unwrap();
        assert_eq!(loaded, identity);

        assert!(store
            .get_identity(&IdentityId::new("nobody"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_identity_conflict() {
        let store = SqliteKeyStore::open_memory().unwrap();
        let identity = make_identity("alice");

        store.put_identity(&identity).await.unwrap();
        let err = store.put_identity(&identity).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_document_roundtrip() {
        let store = SqliteKeyStore::open_memory().unwrap();
        let doc = Document {
            id: DocumentId::new("doc-1"),
            owner_id: IdentityId::new("alice"),
            locator: ContentLocator::of(b"ciphertext"),
            content_type: None,
        };

        let owner_grant = make_grant("doc-1", "alice", WrapMethod::Kek, 1);
        store.put_document(&doc, &owner_grant).await.unwrap();
        assert_eq!(store.get_document(&doc.id).await.unwrap(), Some(doc.clone()));
        assert_eq!(
            store.get_key_grant(&doc.id, &doc.owner_id).await.unwrap(),
            Some(owner_grant.clone())
        );

        let losing_grant = make_grant("doc-1", "alice", WrapMethod::Kek, 2);
        assert!(matches!(
            store.put_document(&doc, &losing_grant).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(
            store.get_key_grant(&doc.id, &doc.owner_id).await.unwrap(),
            Some(owner_grant)
        );
    }

    #[tokio::test]
    async fn test_grant_upsert_keeps_method() {
        let store = SqliteKeyStore::open_memory().unwrap();

        let first = make_grant("doc", "bob", WrapMethod::PublicKey, 1);
        let second = make_grant("doc", "bob", WrapMethod::PublicKey, 2);
        assert_eq!(store.put_key_grant(&first).await.unwrap(), PutResult::Inserted);
        assert_eq!(store.put_key_grant(&second).await.unwrap(), PutResult::Replaced);

        let loaded = store
            .get_key_grant(&DocumentId::new("doc"), &IdentityId::new("bob"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, second);
        assert_eq!(loaded.wrap_method(), WrapMethod::PublicKey);
    }

    #[tokio::test]
    async fn test_grant_listing_and_delete() {
        let store = SqliteKeyStore::open_memory().unwrap();
        store
            .put_key_grant(&make_grant("doc-a", "alice", WrapMethod::Kek, 1))
            .await
            .unwrap();
        store
            .put_key_grant(&make_grant("doc-a", "bob", WrapMethod::PublicKey, 2))
            .await
            .unwrap();
        store
            .put_key_grant(&make_grant("doc-b", "bob", WrapMethod::PublicKey, 3))
            .await
            .unwrap();

        let doc_a = store
            .list_document_grants(&DocumentId::new("doc-a"))
            .await
            .unwrap();
        assert_eq!(doc_a.len(), 2);
        assert_eq!(doc_a[0].wrap_method(), WrapMethod::Kek);

        let bob = IdentityId::new("bob");
        assert_eq!(store.list_holder_grants(&bob).await.unwrap().len(), 2);

        assert!(store
            .delete_key_grant(&DocumentId::new("doc-a"), &bob)
            .await
            .unwrap());
        let remaining = store.list_holder_grants(&bob).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].document_id, DocumentId::new("doc-b"));
    }

    #[tokio::test]
    async fn test_file_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custody.db");
        let identity = make_identity("alice");

        {
            let store = SqliteKeyStore::open(&path).unwrap();
            store.put_identity(&identity).await.unwrap();
        }

        let reopened = SqliteKeyStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_identity(&identity.id).await.unwrap(),
            Some(identity)
        );
    }
}
