//! Card catalog entities
//!
//! Cards are read from JSON shaped like the published catalog file. Loose
//! source fields (series given as text or number, card type given through
//! `type` or `genres`) are resolved once here so every consumer works with
//! typed values.

use std::borrow::Borrow;
use std::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use crate::utils::extract_number;

/// Release batch ("弾") a card belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Series {
    /// Label as given by the source, e.g. "第２弾" or "2"
    pub label: String,
    /// Number extracted from the label's digits
    pub number: Option<u32>,
}

impl Series {
    /// Create a series from its label, extracting the batch number
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            number: extract_number(label),
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for Series {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SeriesValue {
            Text(String),
            Integer(u64),
            Float(f64),
        }

        Ok(match Option::<SeriesValue>::deserialize(deserializer)? {
            Some(SeriesValue::Text(label)) => Series::new(&label),
            Some(SeriesValue::Integer(n)) => Series::new(&n.to_string()),
            Some(SeriesValue::Float(n)) => Series::new(&n.to_string()),
            None => Series::default(),
        })
    }
}

/// Card variant classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CardType {
    /// 通常
    #[default]
    Regular,
    /// 特別
    Special,
    /// 英語
    English,
    /// その他
    Other,
}

impl CardType {
    /// All card types in display order
    pub const ALL: [CardType; 4] = [
        CardType::Regular,
        CardType::Special,
        CardType::English,
        CardType::Other,
    ];

    /// Recognise a source label, `None` when it is not a card type
    pub fn from_label(label: &str) -> Option<CardType> {
        match label.trim() {
            "通常" | "regular" | "Regular" => Some(CardType::Regular),
            "特別" | "special" | "Special" => Some(CardType::Special),
            "英語" | "english" | "English" => Some(CardType::English),
            "その他" | "other" | "Other" => Some(CardType::Other),
            _ => None,
        }
    }

    /// Japanese display label
    pub fn label(&self) -> &'static str {
        match self {
            CardType::Regular => "通常",
            CardType::Special => "特別",
            CardType::English => "英語",
            CardType::Other => "その他",
        }
    }

    /// Resolve the type of a card from its `type` field and `genres` tags
    ///
    /// `type` wins over `genres`. Absent data means a regular card, data
    /// that names no known type means `Other`.
    pub fn resolve(type_label: Option<&str>, genres: &[String]) -> CardType {
        if let Some(label) = type_label.filter(|l| !l.trim().is_empty()) {
            return CardType::from_label(label).unwrap_or(CardType::Other);
        }
        if genres.is_empty() {
            return CardType::Regular;
        }
        genres
            .iter()
            .find_map(|g| CardType::from_label(g))
            .unwrap_or(CardType::Other)
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for CardType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for CardType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        CardType::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown card type: {label}")))
    }
}

/// Name of a per-card boolean flag tracked in the collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagName(String);

impl FlagName {
    /// The user owns the physical card
    pub const OWNED: &'static str = "owned";
    /// The user has visited and photographed the lid ("実物")
    pub const REAL: &'static str = "real";
    /// The user marked the card as a favorite
    pub const FAVORITE: &'static str = "favorite";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn owned() -> Self {
        Self::new(Self::OWNED)
    }

    pub fn real() -> Self {
        Self::new(Self::REAL)
    }

    pub fn favorite() -> Self {
        Self::new(Self::FAVORITE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if a name can be stored
    ///
    /// Names must be non-empty and free of `:`, which separates the flag
    /// from the card id in document ids.
    pub fn is_valid(name: &str) -> bool {
        !name.is_empty() && !name.contains(':')
    }
}

impl Default for FlagName {
    fn default() -> Self {
        Self::owned()
    }
}

impl Borrow<str> for FlagName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FlagName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for FlagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Card record as it appears in the catalog source
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCard {
    #[serde(default)]
    id: String,
    #[serde(default)]
    series: Series,
    #[serde(default)]
    prefecture: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    distribution_place: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default, rename = "type")]
    type_label: Option<String>,
    #[serde(default)]
    jis_code: String,
    #[serde(default)]
    product_number: String,
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCard", rename_all = "camelCase")]
pub struct CardRecord {
    /// Unique identifier, e.g. "01-208-A001"
    pub id: String,
    /// Release batch
    pub series: Series,
    pub prefecture: String,
    pub city: String,
    /// Thumbnail image reference
    pub image_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Where the card is handed out
    pub distribution_place: String,
    pub details: String,
    /// Classification tags
    pub genres: Vec<String>,
    /// Type label as given by the source
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
    /// Municipality code (全国地方公共団体コード)
    pub jis_code: String,
    pub product_number: String,
    /// Variant resolved from `type_label` and `genres`
    #[serde(skip_serializing)]
    pub card_type: CardType,
}

impl From<RawCard> for CardRecord {
    fn from(raw: RawCard) -> Self {
        let card_type = CardType::resolve(raw.type_label.as_deref(), &raw.genres);
        Self {
            id: raw.id,
            series: raw.series,
            prefecture: raw.prefecture,
            city: raw.city,
            image_url: raw.image_url,
            latitude: raw.latitude,
            longitude: raw.longitude,
            distribution_place: raw.distribution_place,
            details: raw.details,
            genres: raw.genres,
            type_label: raw.type_label,
            jis_code: raw.jis_code,
            product_number: raw.product_number,
            card_type,
        }
    }
}

impl CardRecord {
    /// Product code part of the id ("A001" for "01-208-A001")
    pub fn product_code(&self) -> Option<&str> {
        self.id.split('-').nth(2).filter(|s| !s.is_empty())
    }

    /// Sequence number shown in the "No." column
    ///
    /// Falls back to the product number and then to the whole id when the id
    /// does not have the usual three parts.
    pub fn sequence_number(&self) -> &str {
        if let Some(code) = self.product_code() {
            return code;
        }
        if !self.product_number.is_empty() {
            return &self.product_number;
        }
        &self.id
    }

    /// Coordinates of the distribution site, when both are known
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}
