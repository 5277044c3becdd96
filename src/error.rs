//! Error types for the manhole card collection core

use thiserror::Error;

/// Main error type for catalog and collection operations
#[derive(Error, Debug)]
pub enum CollectionError {
    /// Catalog source unreachable or data not shaped like card records
    #[error("Catalog load error: {0}")]
    Load(String),

    /// Persisted collection state missing or unparseable
    #[error("Persistence read error: {0}")]
    PersistenceRead(String),

    /// Persistence adapter failed to store a mutation
    #[error("Persistence write error: {0}")]
    PersistenceWrite(String),

    /// CSV import row is malformed or references an unknown group
    #[error("Import format error at line {line}: {reason}")]
    ImportFormat {
        /// 1-based line number in the imported text
        line: usize,
        /// What was wrong with the row
        reason: String,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for CollectionError {
    fn from(err: rusqlite::Error) -> Self {
        CollectionError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(err: serde_json::Error) -> Self {
        CollectionError::Serialization(err.to_string())
    }
}

/// Result type alias for collection operations
pub type Result<T> = std::result::Result<T, CollectionError>;
