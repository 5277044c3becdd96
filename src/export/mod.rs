//! CSV exchange of collection flags
//!
//! Cards are grouped by municipality and sequence number ("No."); a group
//! holds the versions of one design (regular, English, ...). Each CSV
//! column covers one flag, optionally restricted to one card version.
//!
//! ```text
//! 市町村,No.,カード所持,実物所持
//! "北見市","A001","1","0"
//! ```

pub mod csv;

use std::collections::HashMap;
use crate::business::{CardRecord, CardType, Catalog, CollectionState, FlagName};
use crate::config::FlagSpec;
use crate::error::CollectionError;

/// Header of the municipality column
pub const CITY_HEADER: &str = "市町村";

/// Header of the sequence number column
pub const NUMBER_HEADER: &str = "No.";

/// Suffix appended to every flag column label
pub const FLAG_HEADER_SUFFIX: &str = "所持";

/// Cards sharing municipality and sequence number
#[derive(Debug, Clone)]
pub struct CardGroup<'a> {
    pub city: &'a str,
    pub number: &'a str,
    pub cards: Vec<&'a CardRecord>,
}

impl<'a> CardGroup<'a> {
    /// Cards of the group a column applies to
    fn covered(&self, version: Option<CardType>) -> impl Iterator<Item = &'a CardRecord> + '_ {
        self.cards
            .iter()
            .copied()
            .filter(move |card| version.is_none_or(|v| card.card_type == v))
    }
}

/// Group catalog cards by (municipality, number), in catalog order
pub fn group_cards(catalog: &Catalog) -> Vec<CardGroup<'_>> {
    let mut groups: Vec<CardGroup<'_>> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for card in catalog.cards() {
        let key = (card.city.as_str(), card.sequence_number());
        match index.get(&key) {
            Some(&position) => groups[position].cards.push(card),
            None => {
                index.insert(key, groups.len());
                groups.push(CardGroup {
                    city: key.0,
                    number: key.1,
                    cards: vec![card],
                });
            }
        }
    }

    groups
}

/// One flag column of the CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvColumn {
    pub flag: FlagName,
    /// Restrict the column to one card version
    pub version: Option<CardType>,
    /// Column label without the "所持" suffix
    pub label: String,
}

impl CsvColumn {
    pub fn header(&self) -> String {
        format!("{}{}", self.label, FLAG_HEADER_SUFFIX)
    }
}

/// Ordered set of flag columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvLayout {
    columns: Vec<CsvColumn>,
}

impl CsvLayout {
    pub fn new(columns: Vec<CsvColumn>) -> Self {
        Self { columns }
    }

    /// Columns fitting a catalog
    ///
    /// A catalog with a single card version gets one column per flag. When
    /// several versions exist every flag gets one column per version, labelled
    /// with the version name (prefixed by the flag label if more than one flag
    /// is tracked).
    pub fn for_catalog(catalog: &Catalog, flags: &[FlagSpec]) -> Self {
        let mut versions = catalog.card_types();
        versions.sort();

        if versions.len() <= 1 {
            return Self::new(
                flags
                    .iter()
                    .map(|spec| CsvColumn {
                        flag: spec.name.clone(),
                        version: None,
                        label: spec.label.clone(),
                    })
                    .collect(),
            );
        }

        let mut columns = Vec::with_capacity(flags.len() * versions.len());
        for spec in flags {
            for version in &versions {
                let label = if flags.len() == 1 {
                    version.label().to_string()
                } else {
                    format!("{}{}", spec.label, version.label())
                };
                columns.push(CsvColumn {
                    flag: spec.name.clone(),
                    version: Some(*version),
                    label,
                });
            }
        }
        Self::new(columns)
    }

    pub fn columns(&self) -> &[CsvColumn] {
        &self.columns
    }

    /// Full header row
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![CITY_HEADER.to_string(), NUMBER_HEADER.to_string()];
        headers.extend(self.columns.iter().map(CsvColumn::header));
        headers
    }
}

/// Outcome of a CSV import
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Rows matched to a card group
    pub rows_matched: usize,
    /// Rows that were skipped, as `ImportFormat` errors
    pub skipped: Vec<CollectionError>,
    /// Header labels that match no column of the layout by label or position
    pub unknown_columns: Vec<String>,
    /// Number of individual flag changes applied
    pub flags_changed: usize,
}

/// Render the collection as CSV text
pub fn export_csv(catalog: &Catalog, state: &CollectionState, layout: &CsvLayout) -> String {
    let mut rows = Vec::new();
    rows.push(layout.headers());

    for group in group_cards(catalog) {
        let mut row = vec![group.city.to_string(), group.number.to_string()];
        for column in layout.columns() {
            let mut covered = group.covered(column.version).peekable();
            let cell = if covered.peek().is_none() {
                ""
            } else if covered.all(|card| state.has(&card.id, column.flag.as_str())) {
                "1"
            } else {
                "0"
            };
            row.push(cell.to_string());
        }
        rows.push(row);
    }

    csv::write_document(&rows)
}

/// Apply CSV text to the collection state
///
/// Flag columns are mapped by header label, or by position after the two
/// fixed columns when the label is unknown. Rows are matched by exact
/// (municipality, number). Matched rows set each
/// mapped flag to `cell == "1"` for the cards the column covers; groups
/// without a row keep their flags. Unmatched or malformed rows are reported
/// and skipped.
pub fn import_csv(
    catalog: &Catalog,
    state: &mut CollectionState,
    layout: &CsvLayout,
    text: &str,
) -> ImportReport {
    let mut report = ImportReport::default();
    let mut records = csv::parse_document(text).into_iter();

    let Some(header) = records.next() else {
        return report;
    };

    let columns = layout.columns();
    let labels: Vec<&str> = header.fields.iter().skip(2).map(|l| l.trim()).collect();
    let by_label: Vec<Option<usize>> = labels
        .iter()
        .map(|label| columns.iter().position(|c| c.header() == *label))
        .collect();

    // Unknown labels fall back to the column at the same position unless
    // another header already names that column
    let mut mapping: Vec<(usize, &CsvColumn)> = Vec::new();
    for (offset, label) in labels.iter().enumerate() {
        let index = by_label[offset]
            .or_else(|| Some(offset).filter(|i| *i < columns.len() && !by_label.contains(&Some(*i))));
        match index {
            Some(index) => {
                if by_label[offset].is_none() {
                    log::info!("CSV column {label:?} read as {:?}", columns[index].header());
                }
                mapping.push((offset + 2, &columns[index]));
            }
            None => report.unknown_columns.push(label.to_string()),
        }
    }

    let groups = group_cards(catalog);
    let lookup: HashMap<(&str, &str), &CardGroup<'_>> =
        groups.iter().map(|g| ((g.city, g.number), g)).collect();

    for record in records {
        if record.fields.len() < 2 {
            report.skipped.push(CollectionError::ImportFormat {
                line: record.line,
                reason: "expected municipality and number".to_string(),
            });
            continue;
        }

        let city = record.fields[0].trim();
        let number = record.fields[1].trim();
        let Some(group) = lookup.get(&(city, number)) else {
            report.skipped.push(CollectionError::ImportFormat {
                line: record.line,
                reason: format!("no cards for {city} {number}"),
            });
            continue;
        };

        report.rows_matched += 1;
        for (position, column) in &mapping {
            let value = record.fields.get(*position).is_some_and(|cell| cell.trim() == "1");
            for card in group.covered(column.version) {
                if state.set(&card.id, column.flag.as_str(), value) {
                    report.flags_changed += 1;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::catalog::tests::sample_catalog;

    fn versioned_catalog() -> Catalog {
        Catalog::from_json_str(r#"[
            {"id": "01-208-A001", "prefecture": "北海道", "city": "北見市", "series": "2", "type": "通常"},
            {"id": "01-208-A001-E", "prefecture": "北海道", "city": "北見市", "series": "2", "type": "英語"},
            {"id": "02-100-A001", "prefecture": "青森県", "city": "青森市", "series": "1", "type": "通常"}
        ]"#).unwrap()
    }

    fn owned_only() -> Vec<FlagSpec> {
        vec![FlagSpec::new(FlagName::OWNED, "カード")]
    }

    fn body(text: &str) -> &str {
        text.strip_prefix(csv::BOM).unwrap()
    }

    #[test]
    fn test_group_cards_by_city_and_number() {
        let catalog = Catalog::from_json_str(r#"[
            {"id": "01-208-A001", "city": "北見市"},
            {"id": "02-100-A001", "city": "青森市"},
            {"id": "X", "productNumber": "A001", "city": "北見市"}
        ]"#).unwrap();
        let groups = group_cards(&catalog);
        assert_eq!(groups.len(), 2);
        assert_eq!((groups[0].city, groups[0].number), ("北見市", "A001"));
        assert_eq!(groups[0].cards.len(), 2);
        assert_eq!(groups[1].city, "青森市");
    }

    #[test]
    fn test_layout_single_version() {
        let layout = CsvLayout::for_catalog(&sample_catalog(), &FlagSpec::defaults());
        assert_eq!(layout.headers(), vec!["市町村", "No.", "カード所持", "実物所持"]);
    }

    #[test]
    fn test_layout_per_version() {
        let catalog = versioned_catalog();
        let layout = CsvLayout::for_catalog(&catalog, &owned_only());
        assert_eq!(layout.headers(), vec!["市町村", "No.", "通常所持", "英語所持"]);

        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());
        assert_eq!(layout.columns().len(), 4);
        assert_eq!(layout.columns()[3].header(), "実物英語所持");
    }

    #[test]
    fn test_export_format() {
        let catalog = sample_catalog();
        let mut state = CollectionState::new();
        state.set("01-208-A001", FlagName::OWNED, true);
        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());

        let text = export_csv(&catalog, &state, &layout);
        assert!(text.starts_with(csv::BOM));
        assert_eq!(
            body(&text),
            "\"市町村\",\"No.\",\"カード所持\",\"実物所持\"\n\
             \"北見市\",\"A001\",\"1\",\"0\"\n\
             \"青森市\",\"A001\",\"0\",\"0\""
        );
    }

    #[test]
    fn test_export_blank_for_missing_version() {
        let catalog = versioned_catalog();
        let mut state = CollectionState::new();
        state.set("01-208-A001-E", FlagName::OWNED, true);
        let layout = CsvLayout::for_catalog(&catalog, &owned_only());

        let text = export_csv(&catalog, &state, &layout);
        let lines: Vec<&str> = body(&text).lines().collect();
        assert_eq!(lines[1], "\"北見市\",\"A001\",\"0\",\"1\"");
        assert_eq!(lines[2], "\"青森市\",\"A001\",\"0\",\"\"");
    }

    #[test]
    fn test_import_leaves_missing_rows_untouched() {
        let catalog = sample_catalog();
        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());
        let mut state = CollectionState::new();
        state.set("02-100-A001", FlagName::OWNED, true);
        state.set("02-100-A001", FlagName::REAL, true);

        let text = "市町村,No.,カード所持,実物所持\n北見市,A001,1,\n";
        let report = import_csv(&catalog, &mut state, &layout, text);

        assert_eq!(report.rows_matched, 1);
        assert!(state.has("01-208-A001", FlagName::OWNED));
        assert!(!state.has("01-208-A001", FlagName::REAL));
        assert!(state.has("02-100-A001", FlagName::OWNED));
        assert!(state.has("02-100-A001", FlagName::REAL));
    }

    #[test]
    fn test_import_clears_flags_not_marked() {
        let catalog = sample_catalog();
        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());
        let mut state = CollectionState::new();
        state.set("01-208-A001", FlagName::OWNED, true);

        let report = import_csv(&catalog, &mut state, &layout, "市町村,No.,カード所持\n北見市,A001,0\n");
        assert_eq!(report.flags_changed, 1);
        assert!(!state.has("01-208-A001", FlagName::OWNED));
    }

    #[test]
    fn test_import_skips_unknown_and_short_rows() {
        let catalog = sample_catalog();
        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());
        let mut state = CollectionState::new();

        let text = "市町村,No.,カード所持,実物所持,メモ\n札幌市,A001,1\nbroken\n青森市,A001,1,,x\n";
        let report = import_csv(&catalog, &mut state, &layout, text);

        assert_eq!(report.rows_matched, 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(report.skipped[0], CollectionError::ImportFormat { line: 2, .. }));
        assert!(matches!(report.skipped[1], CollectionError::ImportFormat { line: 3, .. }));
        assert_eq!(report.unknown_columns, vec!["メモ"]);
        assert!(state.has("02-100-A001", FlagName::OWNED));
    }

    #[test]
    fn test_import_maps_unknown_labels_by_position() {
        let catalog = sample_catalog();
        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());
        let mut state = CollectionState::new();
        state.set("02-100-A001", FlagName::REAL, true);

        let text = "市町村,No.,Card,Photo\n北見市,A001,1,1\n青森市,A001,1,0\n";
        let report = import_csv(&catalog, &mut state, &layout, text);

        assert!(report.unknown_columns.is_empty());
        assert!(state.has("01-208-A001", FlagName::OWNED));
        assert!(state.has("01-208-A001", FlagName::REAL));
        assert!(state.has("02-100-A001", FlagName::OWNED));
        assert!(!state.has("02-100-A001", FlagName::REAL));
    }

    #[test]
    fn test_import_label_wins_over_position() {
        let catalog = sample_catalog();
        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());
        let mut state = CollectionState::new();

        // "実物所持" claims the second column, so "Card" has nowhere to go
        let text = "市町村,No.,実物所持,Card\n北見市,A001,1,1\n";
        let report = import_csv(&catalog, &mut state, &layout, text);

        assert_eq!(report.unknown_columns, vec!["Card"]);
        assert!(state.has("01-208-A001", FlagName::REAL));
        assert!(!state.has("01-208-A001", FlagName::OWNED));
    }

    #[test]
    fn test_import_empty_text() {
        let catalog = sample_catalog();
        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());
        let mut state = CollectionState::new();
        let report = import_csv(&catalog, &mut state, &layout, "");
        assert_eq!(report.rows_matched, 0);
        assert!(state.is_empty());
    }

    #[test]
    fn test_versioned_round_trip() {
        let catalog = versioned_catalog();
        let layout = CsvLayout::for_catalog(&catalog, &FlagSpec::defaults());
        let mut state = CollectionState::new();
        state.set("01-208-A001-E", FlagName::OWNED, true);
        state.set("01-208-A001", FlagName::REAL, true);
        state.set("02-100-A001", FlagName::OWNED, true);

        let text = export_csv(&catalog, &state, &layout);
        let mut restored = CollectionState::new();
        let report = import_csv(&catalog, &mut restored, &layout, &text);

        assert!(report.skipped.is_empty());
        assert_eq!(restored, state);
    }
}
