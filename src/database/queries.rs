//! SQL query operations for database access
//!
//! This module provides low-level query functions for database operations.
//! For collection-level operations, use [`super::SqliteStore`].

use rusqlite::{Connection, OptionalExtension, params};
use crate::error::Result;
use crate::utils::now_timestamp;
use super::models::{RawDocument, RawProperties};

// ============================================================================
// Properties queries
// ============================================================================

/// Check if properties table has any rows
pub fn has_properties(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM mh_properties",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Get all properties from the database
pub fn get_properties(conn: &Connection) -> Result<Option<RawProperties>> {
    let result = conn.query_row(
        "SELECT store_id, version, update_timestamp FROM mh_properties LIMIT 1",
        [],
        |row| {
            Ok(RawProperties {
                store_id: row.get(0)?,
                version: row.get(1)?,
                update_timestamp: row.get(2)?,
            })
        },
    ).optional()?;
    Ok(result)
}

/// Set properties (insert new row)
pub fn set_properties(conn: &Connection, store_id: &str, version: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO mh_properties (store_id, version, update_timestamp) VALUES (?, ?, ?)",
        params![store_id, version, now_timestamp()],
    )?;
    Ok(())
}

// ============================================================================
// Key-value queries
// ============================================================================

/// Get a value by key
pub fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn.query_row(
        "SELECT value FROM mh_kv WHERE key = ?",
        [key],
        |row| row.get(0),
    ).optional()?;
    Ok(value)
}

/// Insert or replace a value
pub fn set_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO mh_kv (key, value, change_timestamp) VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, change_timestamp = excluded.change_timestamp",
        params![key, value, now_timestamp()],
    )?;
    Ok(())
}

/// Delete a value
pub fn delete_value(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM mh_kv WHERE key = ?", [key])?;
    Ok(())
}

/// Keys starting with a prefix, sorted
pub fn get_keys_with_prefix(conn: &Connection, prefix: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT key FROM mh_kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key"
    )?;
    let keys = stmt
        .query_map([prefix], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(keys)
}

// ============================================================================
// Document queries
// ============================================================================

/// Get all documents of a user
pub fn get_documents(conn: &Connection, user_id: &str) -> Result<Vec<RawDocument>> {
    let mut stmt = conn.prepare(
        "SELECT doc_id, body, change_timestamp FROM mh_documents WHERE user_id = ? ORDER BY doc_id"
    )?;

    let docs = stmt.query_map([user_id], |row| {
        Ok(RawDocument {
            doc_id: row.get(0)?,
            body: row.get(1)?,
            change_timestamp: row.get(2)?,
        })
    })?;

    let mut result = Vec::new();
    for doc in docs {
        result.push(doc?);
    }
    Ok(result)
}

/// Create or replace a document
pub fn put_document(conn: &Connection, user_id: &str, doc_id: &str, body: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO mh_documents (user_id, doc_id, body, change_timestamp) VALUES (?, ?, ?, ?)
         ON CONFLICT(user_id, doc_id) DO UPDATE SET body = excluded.body, change_timestamp = excluded.change_timestamp",
        params![user_id, doc_id, body, now_timestamp()],
    )?;
    Ok(())
}

/// Delete a document
pub fn delete_document(conn: &Connection, user_id: &str, doc_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM mh_documents WHERE user_id = ? AND doc_id = ?",
        params![user_id, doc_id],
    )?;
    Ok(())
}

/// Number of documents of a user
pub fn count_documents(conn: &Connection, user_id: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM mh_documents WHERE user_id = ?",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}
