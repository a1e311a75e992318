//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch that moves the schema from version N to N+1.
//! Applied versions are recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: identities, documents and key grants.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE identities (
            identity_id TEXT PRIMARY KEY,
            auth_salt BLOB NOT NULL,
            encryption_salt BLOB NOT NULL,
            public_key BLOB NOT NULL,           -- SPKI DER
            wrapped_private_key BLOB NOT NULL,  -- nonce || ct || tag under the KEK
            created_at INTEGER NOT NULL
        );

        CREATE TABLE documents (
            document_id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            locator BLOB NOT NULL,              -- 32 bytes, Blake3 of ciphertext
            content_type TEXT,
            created_at INTEGER NOT NULL
        );

        -- One wrapped content key per (document, holder)
        CREATE TABLE key_grants (
            document_id TEXT NOT NULL,
            holder_id TEXT NOT NULL,
            wrap_method INTEGER NOT NULL,       -- WrapMethod as u8
            wrapped_key BLOB NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (document_id, holder_id)
        );

        CREATE INDEX idx_documents_owner ON documents(owner_id);
        CREATE INDEX idx_key_grants_holder ON key_grants(holder_id);
        "#,
    )?;

    Ok(())
}

/// Current time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
