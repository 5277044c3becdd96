//! Database layer
//!
//! SQLite storage for collection state:
//! - Schema creation and version checks
//! - Key-value rows for device-style persistence
//! - Per-user documents for remote-style persistence

pub mod models;
pub mod schema;
pub mod connection;
pub mod queries;
pub mod store;
pub mod version;

pub use connection::Database;
pub use models::*;
pub use store::SqliteStore;
