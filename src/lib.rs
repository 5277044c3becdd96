//! # Manhole Card Collection Core
//!
//! A library for tracking a collection of Japanese manhole cards.
//!
//! ## Features
//!
//! - Catalog loading from JSON files, embedded text or document collections
//! - Named per-card flags (owned, photographed, favorite, ...), notes and a total override
//! - Filtering, sorting, grouping and pagination of the catalog
//! - Collection progress per scope and per prefecture
//! - CSV and JSON import/export
//! - Key-value and per-user document persistence, in memory or SQLite
//!
//! ## Example
//!
//! ```no_run
//! use mhcore::{FilterCriteria, FlagName, Session, SessionConfig};
//! use std::path::Path;
//!
//! let config = SessionConfig::from_file(Path::new("mhcard.json")).unwrap();
//! let mut session = Session::open(&config).unwrap();
//!
//! session.toggle("01-208-A001", FlagName::OWNED);
//!
//! let criteria = FilterCriteria { prefecture: Some("北海道".to_string()), ..Default::default() };
//! let view = session.filter(&criteria);
//! let progress = session.progress(&view, FlagName::OWNED);
//! println!("{}/{} ({}%)", progress.owned_count, progress.total, progress.percent);
//! ```

pub mod business;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod storage;
pub mod utils;

// Re-export main types
pub use error::{CollectionError, Result};
pub use business::{
    Catalog, CatalogSource, CardLinks, CardRecord, CardType, Collection, CollectionSnapshot,
    CollectionState, DocumentSource, FilterCriteria, FilteredView, FlagName, JsonFileSource,
    JsonStrSource, OwnershipFilter, Page, Pager, PrefectureGroup, Progress, Series, Session,
    SortMode,
};
pub use config::{FlagSpec, SessionConfig};
pub use database::SqliteStore;
pub use export::{CsvColumn, CsvLayout, ImportReport};
pub use storage::{
    DocumentPersistence, FlagDocumentStore, KeyValuePersistence, KeyValueStore, MemoryDocuments,
    MemoryStore, Persistence,
};

/// Database schema version
pub const SCHEMA_VERSION: &str = "1";

/// Version written into JSON snapshots
pub const SNAPSHOT_VERSION: u32 = 1;

/// Prefix of the versioned key-value keys
pub const DEFAULT_KEY_PREFIX: &str = "mhcard.v1";

/// Unversioned key of the owned ids in older stores
pub const LEGACY_OWNED_KEY: &str = "ownedIds";

/// Unversioned key of the photographed ids in older stores
pub const LEGACY_REAL_KEY: &str = "realIds";

/// Document id prefix of flag documents
pub const FLAG_DOC_PREFIX: &str = "flag:";

/// Document id prefix of note documents
pub const MEMO_DOC_PREFIX: &str = "memo:";

/// Document id of the total override
pub const TOTAL_DOC_ID: &str = "setting:total";

/// Default cards per page
pub const DEFAULT_PAGE_SIZE: usize = 24;

/// Catalog filename
pub const CATALOG_FILENAME: &str = "manhole_cards.json";

/// Database filename
pub const DATABASE_FILENAME: &str = "mhcollection.dat";
