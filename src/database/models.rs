//! Data models for stored rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::storage::StoredDocument;
use crate::utils::parse_datetime;

/// Store properties and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProperties {
    /// Unique store identifier (32 chars)
    pub store_id: String,
    /// Database schema version
    pub version: String,
    /// Last update timestamp
    pub update_timestamp: Option<DateTime<Utc>>,
}

impl Default for StoreProperties {
    fn default() -> Self {
        Self {
            store_id: String::new(),
            version: crate::SCHEMA_VERSION.to_string(),
            update_timestamp: None,
        }
    }
}

/// Raw properties row
#[derive(Debug, Clone)]
pub struct RawProperties {
    pub store_id: String,
    pub version: Option<String>,
    pub update_timestamp: Option<String>,
}

impl From<RawProperties> for StoreProperties {
    fn from(raw: RawProperties) -> Self {
        Self {
            store_id: raw.store_id,
            version: raw.version.unwrap_or_else(|| "1".to_string()),
            update_timestamp: raw.update_timestamp.as_deref().and_then(parse_datetime),
        }
    }
}

/// Raw document row
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub doc_id: String,
    pub body: String,
    pub change_timestamp: Option<String>,
}

impl From<RawDocument> for StoredDocument {
    /// Rows without a readable timestamp sort as the oldest
    fn from(raw: RawDocument) -> Self {
        Self {
            doc_id: raw.doc_id,
            body: raw.body,
            changed_at: raw
                .change_timestamp
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_from_raw() {
        let props: StoreProperties = RawProperties {
            store_id: "abc".to_string(),
            version: None,
            update_timestamp: Some("2024-03-01 10:20:30".to_string()),
        }.into();
        assert_eq!(props.version, "1");
        assert_eq!(props.update_timestamp.unwrap().to_string(), "2024-03-01 10:20:30 UTC");
    }

    #[test]
    fn test_document_from_raw() {
        let doc: StoredDocument = RawDocument {
            doc_id: "flag:owned:01-208-A001".to_string(),
            body: "{}".to_string(),
            change_timestamp: Some("garbage".to_string()),
        }.into();
        assert_eq!(doc.changed_at, DateTime::<Utc>::UNIX_EPOCH);
    }
}
