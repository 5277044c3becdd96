//! SQLite-backed collection storage
//!
//! One file holds both storage shapes, so the same store can back
//! [`crate::storage::KeyValuePersistence`] or [`crate::storage::DocumentPersistence`].

use std::path::Path;
use crate::error::{CollectionError, Result};
use crate::storage::{FlagDocumentStore, KeyValueStore, StoredDocument};
use crate::utils::generate_store_id;
use super::connection::Database;
use super::version::{self, CURRENT_VERSION};
use super::models::StoreProperties;
use super::{queries, schema};

fn read_failure(err: CollectionError) -> CollectionError {
    CollectionError::PersistenceRead(err.to_string())
}

fn write_failure(err: CollectionError) -> CollectionError {
    CollectionError::PersistenceWrite(err.to_string())
}

/// Collection storage in a SQLite database
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the store at `path`, creating it when the file does not exist
    pub fn open(path: &Path) -> Result<Self> {
        let db = if path.exists() {
            Database::open(path)?
        } else {
            log::info!("Creating collection store at {}", path.display());
            Database::create(path)?
        };
        Self::initialize(db)
    }

    /// A store kept in memory, lost when dropped
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Database::open_in_memory()?)
    }

    fn initialize(db: Database) -> Result<Self> {
        let conn = db.connection()?;
        conn.execute(schema::CREATE_PROPERTIES_TABLE, [])?;

        if queries::has_properties(conn)? {
            let stored = version::get_database_version(conn)?;
            if !version::is_version_compatible(&stored) {
                return Err(CollectionError::Database(format!(
                    "Store version {} is newer than supported version {}",
                    stored, CURRENT_VERSION
                )));
            }
            return Ok(Self { db });
        }

        db.transaction(|conn| {
            for sql in schema::CREATE_ALL_TABLES {
                conn.execute(sql, [])?;
            }
            queries::set_properties(conn, &generate_store_id(), CURRENT_VERSION)
        })?;
        Ok(Self { db })
    }

    /// Store id and schema version
    pub fn properties(&self) -> Result<StoreProperties> {
        let raw = queries::get_properties(self.db.connection()?)?
            .ok_or_else(|| CollectionError::Database("Store properties missing".to_string()))?;
        Ok(raw.into())
    }

    /// Keys starting with `prefix`, sorted
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        queries::get_keys_with_prefix(self.db.connection()?, prefix)
    }

    /// Number of documents saved for a user
    pub fn document_count(&self, user_id: &str) -> Result<usize> {
        queries::count_documents(self.db.connection()?, user_id)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.connection().map_err(read_failure)?;
        queries::get_value(conn, key).map_err(read_failure)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let conn = self.db.connection().map_err(write_failure)?;
        queries::set_value(conn, key, value).map_err(write_failure)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let conn = self.db.connection().map_err(write_failure)?;
        queries::delete_value(conn, key).map_err(write_failure)
    }
}

impl FlagDocumentStore for SqliteStore {
    fn list(&self, user_id: &str) -> Result<Vec<StoredDocument>> {
        let conn = self.db.connection().map_err(read_failure)?;
        let docs = queries::get_documents(conn, user_id).map_err(read_failure)?;
        Ok(docs.into_iter().map(StoredDocument::from).collect())
    }

    fn put(&mut self, user_id: &str, doc_id: &str, body: &str) -> Result<()> {
        let conn = self.db.connection().map_err(write_failure)?;
        queries::put_document(conn, user_id, doc_id, body).map_err(write_failure)
    }

    fn delete(&mut self, user_id: &str, doc_id: &str) -> Result<()> {
        let conn = self.db.connection().map_err(write_failure)?;
        queries::delete_document(conn, user_id, doc_id).map_err(write_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::TempDir;

    #[test]
    fn test_new_store_has_properties() {
        let store = SqliteStore::open_in_memory().unwrap();
        let props = store.properties().unwrap();
        assert_eq!(props.store_id.len(), 32);
        assert_eq!(props.version, CURRENT_VERSION);
        assert!(props.update_timestamp.is_some());
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(crate::DATABASE_FILENAME);

        let store_id = {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set("mhcard.v1.flags.owned", r#"["01-208-A001"]"#).unwrap();
            store.put("alice", "flag:owned:01-208-A001", "{}").unwrap();
            store.properties().unwrap().store_id
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.properties().unwrap().store_id, store_id);
        assert_eq!(store.get("mhcard.v1.flags.owned").unwrap().as_deref(), Some(r#"["01-208-A001"]"#));
        assert_eq!(store.document_count("alice").unwrap(), 1);
        assert_eq!(store.keys_with_prefix("mhcard.v1.").unwrap(), vec!["mhcard.v1.flags.owned"]);
    }

    #[test]
    fn test_documents_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.put("alice", "memo:01-208-A001", r#"{"cardId":"01-208-A001","text":"メモ"}"#).unwrap();

        let docs = store.list("alice").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].doc_id, "memo:01-208-A001");
        assert!(docs[0].changed_at > chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);

        store.delete("alice", "memo:01-208-A001").unwrap();
        store.delete("alice", "memo:01-208-A001").unwrap();
        assert!(store.list("alice").unwrap().is_empty());
    }

    #[test]
    fn test_existing_store_keeps_properties() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("existing.dat");
        {
            let conn = Connection::open(&path).unwrap();
            for sql in schema::CREATE_ALL_TABLES {
                conn.execute(sql, []).unwrap();
            }
            conn.execute_batch(r#"
                INSERT INTO mh_properties (store_id, version) VALUES ('0123456789abcdef0123456789abcdef', '1');
                INSERT INTO mh_kv (key, value) VALUES ('ownedIds', '["01-208-A001"]');
            "#).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let props = store.properties().unwrap();
        assert_eq!(props.store_id, "0123456789abcdef0123456789abcdef");
        assert_eq!(props.version, "1");
        assert_eq!(store.get("ownedIds").unwrap().as_deref(), Some(r#"["01-208-A001"]"#));
    }

    #[test]
    fn test_newer_store_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("future.dat");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(r#"
                CREATE TABLE mh_properties (store_id CHAR(32) PRIMARY KEY, version CHAR(10), update_timestamp TEXT);
                INSERT INTO mh_properties (store_id, version) VALUES ('x', '9');
            "#).unwrap();
        }

        assert!(matches!(SqliteStore::open(&path), Err(CollectionError::Database(_))));
    }

    #[test]
    fn test_closed_database_write_fails() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.db.close();
        assert!(matches!(store.set("k", "v"), Err(CollectionError::PersistenceWrite(_))));
        assert!(matches!(store.get("k"), Err(CollectionError::PersistenceRead(_))));
    }
}
