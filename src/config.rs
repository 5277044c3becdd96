//! Session configuration
//!
//! Read from a JSON file; every field has a default so a partial file (or no
//! file at all) is valid.
//!
//! ```json
//! {
//!   "catalogPath": "public/manhole_cards.json",
//!   "storagePath": "data/mhcollection.dat",
//!   "userId": null,
//!   "flags": [{"name": "owned", "label": "カード"}, {"name": "real", "label": "実物"}],
//!   "pageSize": 24
//! }
//! ```

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::business::FlagName;
use crate::error::{CollectionError, Result};
use crate::{DEFAULT_KEY_PREFIX, DEFAULT_PAGE_SIZE};

/// A tracked flag and its display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSpec {
    pub name: FlagName,
    pub label: String,
}

impl FlagSpec {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: FlagName::new(name),
            label: label.to_string(),
        }
    }

    /// Owned ("カード") and photographed ("実物")
    pub fn defaults() -> Vec<FlagSpec> {
        vec![
            FlagSpec::new(FlagName::OWNED, "カード"),
            FlagSpec::new(FlagName::REAL, "実物"),
        ]
    }
}

/// Settings for one application session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Catalog JSON file, no catalog is loaded when unset
    pub catalog_path: Option<PathBuf>,
    /// SQLite file for the collection, kept in memory when unset
    pub storage_path: Option<PathBuf>,
    /// Prefix of the versioned storage keys
    pub key_prefix: String,
    /// When set, the collection is saved as per-user documents
    pub user_id: Option<String>,
    /// Flags shown and exchanged through CSV
    pub flags: Vec<FlagSpec>,
    /// Cards per page
    pub page_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            storage_path: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            user_id: None,
            flags: FlagSpec::defaults(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SessionConfig {
    /// Parse configuration JSON
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: SessionConfig =
            serde_json::from_str(text).map_err(|e| CollectionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a JSON file
    ///
    /// Relative catalog and storage paths are resolved against the file's folder.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CollectionError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_json_str(&text)?;

        if let Some(base) = path.parent() {
            config.catalog_path = config.catalog_path.map(|p| resolve(base, p));
            config.storage_path = config.storage_path.map(|p| resolve(base, p));
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CollectionError::Config("pageSize must be at least 1".to_string()));
        }
        if self.key_prefix.is_empty() {
            return Err(CollectionError::Config("keyPrefix must not be empty".to_string()));
        }
        if let Some(spec) = self.flags.iter().find(|f| !FlagName::is_valid(f.name.as_str())) {
            return Err(CollectionError::Config(format!("invalid flag name: {:?}", spec.name.as_str())));
        }
        Ok(())
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() { path } else { base.join(path) }
}
