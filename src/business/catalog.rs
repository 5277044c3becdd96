//! Catalog store
//!
//! The catalog is loaded once per session from a [`CatalogSource`] and is
//! read-only afterwards.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use serde_json::Value;
use crate::error::{CollectionError, Result};
use super::card::{CardRecord, CardType};

/// Where card records come from
pub trait CatalogSource {
    /// Fetch every card record
    fn fetch(&self) -> Result<Vec<CardRecord>>;

    /// Short description used in log messages
    fn describe(&self) -> String;
}

/// Static JSON file holding an array of card records
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }
}

impl CatalogSource for JsonFileSource {
    fn fetch(&self) -> Result<Vec<CardRecord>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            CollectionError::Load(format!("{}: {}", self.path.display(), e))
        })?;
        parse_records(&text)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// JSON text already in memory (embedded or received from elsewhere)
pub struct JsonStrSource<'a> {
    text: &'a str,
}

impl<'a> JsonStrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

impl CatalogSource for JsonStrSource<'_> {
    fn fetch(&self) -> Result<Vec<CardRecord>> {
        parse_records(self.text)
    }

    fn describe(&self) -> String {
        format!("inline JSON ({} bytes)", self.text.len())
    }
}

/// Remote document collection, one document per card
///
/// The document ID stands in for `id` when the document body has none.
pub struct DocumentSource {
    documents: Vec<(String, Value)>,
}

impl DocumentSource {
    pub fn new(documents: Vec<(String, Value)>) -> Self {
        Self { documents }
    }
}

impl CatalogSource for DocumentSource {
    fn fetch(&self) -> Result<Vec<CardRecord>> {
        let mut records = Vec::with_capacity(self.documents.len());
        for (doc_id, body) in &self.documents {
            let mut body = body.clone();
            let Some(fields) = body.as_object_mut() else {
                return Err(CollectionError::Load(format!("document {doc_id} is not an object")));
            };
            let has_id = fields.get("id").and_then(Value::as_str).is_some_and(|s| !s.is_empty());
            if !has_id {
                fields.insert("id".to_string(), Value::String(doc_id.clone()));
            }
            let record: CardRecord = serde_json::from_value(body)
                .map_err(|e| CollectionError::Load(format!("document {doc_id}: {e}")))?;
            records.push(record);
        }
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("document collection ({} documents)", self.documents.len())
    }
}

/// Catalog JSON served over HTTP
#[cfg(feature = "http")]
pub struct HttpJsonSource {
    url: String,
}

#[cfg(feature = "http")]
impl HttpJsonSource {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string() }
    }
}

#[cfg(feature = "http")]
impl CatalogSource for HttpJsonSource {
    fn fetch(&self) -> Result<Vec<CardRecord>> {
        let response = reqwest::blocking::get(&self.url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| CollectionError::Load(format!("{}: {}", self.url, e)))?;
        let text = response
            .text()
            .map_err(|e| CollectionError::Load(format!("{}: {}", self.url, e)))?;
        parse_records(&text)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

fn parse_records(text: &str) -> Result<Vec<CardRecord>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    serde_json::from_str(text).map_err(|e| CollectionError::Load(e.to_string()))
}

/// Immutable, ordered card catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cards: Vec<CardRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// A catalog with no cards (before load, or after a failed load)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the catalog from a source
    pub fn load(source: &dyn CatalogSource) -> Result<Self> {
        let records = source.fetch()?;
        let catalog = Self::from_records(records)?;
        log::info!("Loaded {} cards from {}", catalog.len(), source.describe());
        Ok(catalog)
    }

    /// Parse a JSON array of card records
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_records(parse_records(text)?)
    }

    /// Build a catalog, rejecting empty or duplicate ids
    pub fn from_records(cards: Vec<CardRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            if card.id.is_empty() {
                return Err(CollectionError::Load("card without id".to_string()));
            }
            if index.insert(card.id.clone(), position).is_some() {
                return Err(CollectionError::Load(format!("duplicate card id: {}", card.id)));
            }
        }
        Ok(Self { cards, index })
    }

    /// All cards in catalog order
    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Look up a card by id
    pub fn get(&self, id: &str) -> Option<&CardRecord> {
        self.index.get(id).map(|&position| &self.cards[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate over every card id
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|c| c.id.as_str())
    }

    /// Distinct prefectures in catalog order
    pub fn prefectures(&self) -> Vec<&str> {
        distinct(self.cards.iter().map(|c| c.prefecture.as_str()))
    }

    /// Distinct series labels in catalog order
    pub fn series_labels(&self) -> Vec<&str> {
        distinct(self.cards.iter().map(|c| c.series.label.as_str()))
    }

    /// Distinct card types in catalog order
    pub fn card_types(&self) -> Vec<CardType> {
        let mut seen = Vec::new();
        for card in &self.cards {
            if !seen.contains(&card.card_type) {
                seen.push(card.card_type);
            }
        }
        seen
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| !v.is_empty() && seen.insert(*v)).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    pub const SAMPLE_JSON: &str = r#"[
        {"id": "01-208-A001", "series": "第２弾", "prefecture": "北海道", "city": "北見市",
         "details": "ハッカの花", "distributionPlace": "北見市役所", "latitude": 43.8, "longitude": 143.9},
        {"id": "02-100-A001", "series": "第１弾", "prefecture": "青森県", "city": "青森市",
         "details": "ねぶた", "distributionPlace": "青森駅", "latitude": 40.8, "longitude": 140.7}
    ]"#;

    pub fn sample_catalog() -> Catalog {
        Catalog::from_json_str(SAMPLE_JSON).unwrap()
    }

    #[test]
    fn test_from_json_str() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.cards()[0].id, "01-208-A001");
        assert!(catalog.contains("02-100-A001"));
        assert_eq!(catalog.get("02-100-A001").unwrap().city, "青森市");
        assert!(catalog.get("99-999-Z999").is_none());
    }

    #[test]
    fn test_malformed_json_is_load_error() {
        let result = Catalog::from_json_str("{\"cards\": 3}");
        assert!(matches!(result, Err(CollectionError::Load(_))));

        let result = Catalog::from_json_str("<html>");
        assert!(matches!(result, Err(CollectionError::Load(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[{"id": "01-208-A001", "city": "北見市"}, {"id": "01-208-A001", "city": "北見市"}]"#;
        let result = Catalog::from_json_str(json);
        assert!(matches!(result, Err(CollectionError::Load(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_bom_tolerated() {
        let text = format!("\u{feff}{}", SAMPLE_JSON);
        assert_eq!(Catalog::from_json_str(&text).unwrap().len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manhole_cards.json");
        std::fs::write(&path, SAMPLE_JSON).unwrap();

        let catalog = Catalog::load(&JsonFileSource::new(&path)).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let source = JsonFileSource::new(Path::new("/nonexistent/manhole_cards.json"));
        assert!(matches!(Catalog::load(&source), Err(CollectionError::Load(_))));
    }

    #[test]
    fn test_document_source_uses_document_id() {
        let source = DocumentSource::new(vec![
            ("01-208-A001".to_string(), json!({"prefecture": "北海道", "city": "北見市", "series": 2})),
            ("ignored".to_string(), json!({"id": "02-100-A001", "prefecture": "青森県", "city": "青森市"})),
        ]);
        let catalog = Catalog::load(&source).unwrap();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["01-208-A001", "02-100-A001"]);
    }

    #[test]
    fn test_document_source_rejects_non_object() {
        let source = DocumentSource::new(vec![("x".to_string(), json!([1, 2]))]);
        assert!(matches!(Catalog::load(&source), Err(CollectionError::Load(_))));
    }

    #[test]
    fn test_distinct_menus() {
        let json = r#"[
            {"id": "a-1-1", "prefecture": "北海道", "series": "1", "type": "通常"},
            {"id": "a-1-2", "prefecture": "北海道", "series": "2", "type": "英語"},
            {"id": "b-1-1", "prefecture": "青森県", "series": "1", "type": "通常"}
        ]"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        assert_eq!(catalog.prefectures(), vec!["北海道", "青森県"]);
        assert_eq!(catalog.series_labels(), vec!["1", "2"]);
        assert_eq!(catalog.card_types(), vec![CardType::Regular, CardType::English]);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::empty();
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
        assert!(Catalog::from_json_str("[]").unwrap().is_empty());
    }
}
