//! Persistence adapters
//!
//! Two storage shapes are supported:
//! - [`KeyValueStore`]: string values under fixed, versioned keys (device storage)
//! - [`FlagDocumentStore`]: a per-user document collection where the presence
//!   of a document means a flag is set (remote store)
//!
//! [`Persistence`] is the seam the collection writes through; it is
//! implemented on top of either shape by [`KeyValuePersistence`] and
//! [`DocumentPersistence`].

mod memory;
mod persistence;

pub use memory::{MemoryDocuments, MemoryStore};
pub use persistence::{DocumentPersistence, KeyValuePersistence};

use chrono::{DateTime, Utc};
use crate::business::CollectionState;
use crate::error::Result;

/// String key-value storage
pub trait KeyValueStore {
    /// Read a value, `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete a key, absent keys are not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Document stored for a user
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document identifier within the user's collection
    pub doc_id: String,
    /// JSON body
    pub body: String,
    /// Last write time
    pub changed_at: DateTime<Utc>,
}

/// Per-user document collection
///
/// Writes are create-or-replace and delete; concurrent writers resolve by
/// last write wins on each document.
pub trait FlagDocumentStore {
    /// All documents of a user
    fn list(&self, user_id: &str) -> Result<Vec<StoredDocument>>;

    /// Create or replace a document
    fn put(&mut self, user_id: &str, doc_id: &str, body: &str) -> Result<()>;

    /// Delete a document, absent documents are not an error
    fn delete(&mut self, user_id: &str, doc_id: &str) -> Result<()>;
}

/// Where collection state is saved
pub trait Persistence {
    /// Read the saved state, an empty state when nothing was saved yet
    fn load(&mut self) -> Result<CollectionState>;

    /// Save the flag `flag` of `card_id` as it is in `state`
    fn write_flag(&mut self, state: &CollectionState, flag: &str, card_id: &str) -> Result<()>;

    /// Save the note of `card_id` as it is in `state`
    fn write_note(&mut self, state: &CollectionState, card_id: &str) -> Result<()>;

    /// Save the total override as it is in `state`
    fn write_total_override(&mut self, state: &CollectionState) -> Result<()>;

    /// Replace everything saved with `state`
    fn write_all(&mut self, state: &CollectionState) -> Result<()>;
}
