//! Database connection management

use std::path::{Path, PathBuf};
use rusqlite::Connection;
use crate::error::{CollectionError, Result};
use super::schema;

/// Database connection wrapper
pub struct Database {
    /// Path to the database file, `None` for in-memory databases
    path: Option<PathBuf>,
    /// SQLite connection
    conn: Option<Connection>,
}

impl Database {
    /// Open a database at the specified path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Some(conn),
        })
    }

    /// Create a new database with all tables
    pub fn create(path: &Path) -> Result<Self> {
        let db = Self::open(path)?;
        db.create_tables()?;
        Ok(db)
    }

    /// Create a database living only as long as this value, with all tables
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            path: None,
            conn: Some(Connection::open_in_memory()?),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.connection()?;
        for sql in schema::CREATE_ALL_TABLES {
            conn.execute(sql, [])?;
        }
        Ok(())
    }

    /// Get a reference to the connection
    pub fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| {
            CollectionError::Database("Database not open".to_string())
        })
    }

    /// Get the database path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the database connection
    pub fn close(&mut self) {
        self.conn = None;
    }

    /// Check if database is open
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Run `f` inside a transaction, rolling back when it fails
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.connection()?;
        conn.execute("BEGIN TRANSACTION", [])?;
        match f(conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close();
    }
}
