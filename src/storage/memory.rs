//! In-memory stores for tests and sessions without durable storage

use std::collections::{BTreeMap, HashMap};
use chrono::Utc;
use crate::error::{CollectionError, Result};
use super::{FlagDocumentStore, KeyValueStore, StoredDocument};

/// Key-value store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with values
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: values.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            fail_writes: false,
        }
    }

    /// Make every later write fail, simulating unavailable storage
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(CollectionError::PersistenceWrite("storage unavailable".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.values.remove(key);
        Ok(())
    }
}

/// Per-user document collections held in memory
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    users: HashMap<String, BTreeMap<String, StoredDocument>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagDocumentStore for MemoryDocuments {
    fn list(&self, user_id: &str) -> Result<Vec<StoredDocument>> {
        Ok(self
            .users
            .get(user_id)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn put(&mut self, user_id: &str, doc_id: &str, body: &str) -> Result<()> {
        self.users.entry(user_id.to_string()).or_default().insert(
            doc_id.to_string(),
            StoredDocument {
                doc_id: doc_id.to_string(),
                body: body.to_string(),
                changed_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn delete(&mut self, user_id: &str, doc_id: &str) -> Result<()> {
        if let Some(docs) = self.users.get_mut(user_id) {
            docs.remove(doc_id);
        }
        Ok(())
    }
}
