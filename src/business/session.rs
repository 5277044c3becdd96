//! Application session
//!
//! A [`Session`] owns everything one run of the application works with:
//! configuration, the loaded catalog, the collection bound to its
//! persistence and the pager. Dependencies are passed in, so tests can run
//! a session entirely in memory.

use crate::config::SessionConfig;
use crate::database::SqliteStore;
use crate::error::Result;
use crate::export::{CsvLayout, ImportReport};
use crate::storage::{DocumentPersistence, KeyValuePersistence, Persistence};
use super::card::CardRecord;
use super::catalog::{Catalog, CatalogSource, JsonFileSource};
use super::collection::Collection;
use super::filter::{apply, FilterCriteria, FilteredView, Page, Pager};
use super::links::CardLinks;
use super::progress::{self, PrefectureProgress, Progress};

/// Catalog, collection and view state of one application run
pub struct Session {
    config: SessionConfig,
    catalog: Catalog,
    collection: Collection,
    layout: CsvLayout,
    pager: Pager,
}

impl Session {
    /// Create a session and restore the collection from `persistence`
    pub fn new(config: SessionConfig, catalog: Catalog, persistence: Box<dyn Persistence>) -> Self {
        let mut collection = Collection::new(persistence);
        collection.restore();

        let layout = CsvLayout::for_catalog(&catalog, &config.flags);
        let pager = Pager::new(config.page_size);
        Self {
            config,
            catalog,
            collection,
            layout,
            pager,
        }
    }

    /// Open a session as configured
    ///
    /// The collection is kept in the configured SQLite file, in memory when
    /// none is configured or the file cannot be opened. A catalog that fails
    /// to load leaves the session with an empty catalog.
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let store = match &config.storage_path {
            Some(path) => SqliteStore::open(path).or_else(|e| {
                log::warn!("Collection store {} unavailable, keeping changes in memory: {}", path.display(), e);
                SqliteStore::open_in_memory()
            })?,
            None => SqliteStore::open_in_memory()?,
        };

        let persistence: Box<dyn Persistence> = match &config.user_id {
            Some(user_id) => Box::new(DocumentPersistence::new(store, user_id)),
            None => Box::new(KeyValuePersistence::new(store, &config.key_prefix)),
        };

        let mut session = Self::new(config.clone(), Catalog::empty(), persistence);
        if let Some(path) = &config.catalog_path {
            // Failure is logged and leaves the catalog empty
            let _ = session.load_catalog(&JsonFileSource::new(path));
        }
        Ok(session)
    }

    /// Replace the catalog with the cards of `source`
    ///
    /// On failure the catalog is left empty and the error is returned.
    pub fn load_catalog(&mut self, source: &dyn CatalogSource) -> Result<usize> {
        let result = Catalog::load(source);
        let outcome = match result {
            Ok(catalog) => {
                self.catalog = catalog;
                Ok(self.catalog.len())
            }
            Err(e) => {
                log::error!("Catalog unavailable ({}): {}", source.describe(), e);
                self.catalog = Catalog::empty();
                Err(e)
            }
        };
        self.layout = CsvLayout::for_catalog(&self.catalog, &self.config.flags);
        self.pager = Pager::new(self.config.page_size);
        outcome
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut Collection {
        &mut self.collection
    }

    /// Look up a card by id
    pub fn card(&self, card_id: &str) -> Option<&CardRecord> {
        self.catalog.get(card_id)
    }

    /// Check if a card has a flag set (e.g. whether to show the owned badge)
    pub fn is_flagged(&self, card_id: &str, flag: &str) -> bool {
        self.collection.is_flagged(card_id, flag)
    }

    /// Flip a flag on a card, returning the new value
    pub fn toggle(&mut self, card_id: &str, flag: &str) -> bool {
        self.collection.toggle(card_id, flag)
    }

    pub fn set_flag(&mut self, card_id: &str, flag: &str, value: bool) {
        self.collection.set_flag(card_id, flag, value);
    }

    pub fn note(&self, card_id: &str) -> Option<&str> {
        self.collection.state().note(card_id)
    }

    /// Overwrite the note for a card, an empty text removes it
    pub fn set_note(&mut self, card_id: &str, text: &str) {
        self.collection.set_note(card_id, text);
    }

    /// Display label of a configured flag
    pub fn flag_label(&self, flag: &str) -> Option<&str> {
        self.config
            .flags
            .iter()
            .find(|spec| spec.name.as_str() == flag)
            .map(|spec| spec.label.as_str())
    }

    /// Cards matching `criteria`
    pub fn filter(&self, criteria: &FilterCriteria) -> FilteredView<'_> {
        apply(&self.catalog, self.collection.state(), criteria)
    }

    /// Current page of the cards matching `criteria`
    ///
    /// Changed criteria send the pager back to the first page.
    pub fn page(&mut self, criteria: &FilterCriteria) -> Page<'_> {
        self.pager.sync(criteria);
        let view = apply(&self.catalog, self.collection.state(), criteria);
        self.pager.page(&view)
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    /// Progress of `flag` over the cards of a view
    pub fn progress(&self, view: &FilteredView<'_>, flag: &str) -> Progress {
        Progress::compute(view.ids(), self.collection.state().flagged(flag))
    }

    /// Progress of `flag` over the whole catalog, honouring the total override
    pub fn overall_progress(&self, flag: &str) -> Progress {
        let state = self.collection.state();
        Progress::compute(self.catalog.ids(), state.flagged(flag)).with_total(state.total_override())
    }

    /// Progress of `flag` per prefecture of a view
    pub fn prefecture_progress<'a>(&self, view: &FilteredView<'a>, flag: &str) -> Vec<PrefectureProgress<'a>> {
        progress::prefecture_progress(view, self.collection.state(), flag)
    }

    pub fn set_total_override(&mut self, total: Option<u32>) {
        self.collection.set_total_override(total);
    }

    /// Columns used for CSV exchange with the current catalog
    pub fn csv_layout(&self) -> &CsvLayout {
        &self.layout
    }

    pub fn export_csv(&self) -> String {
        self.collection.export_csv(&self.catalog, &self.layout)
    }

    pub fn import_csv(&mut self, text: &str) -> ImportReport {
        self.collection.import_csv(&self.catalog, &self.layout, text)
    }

    /// External links of a card, `None` for unknown ids
    pub fn links(&self, card_id: &str) -> Option<CardLinks> {
        self.catalog.get(card_id).map(CardLinks::for_card)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::business::catalog::tests::{sample_catalog, SAMPLE_JSON};
    use crate::business::catalog::JsonStrSource;
    use crate::business::card::FlagName;
    use crate::business::filter::OwnershipFilter;
    use crate::error::CollectionError;
    use crate::storage::MemoryStore;
    use crate::DEFAULT_KEY_PREFIX;
    use tempfile::TempDir;

    fn memory_persistence(store: MemoryStore) -> Box<dyn Persistence> {
        Box::new(KeyValuePersistence::new(store, DEFAULT_KEY_PREFIX))
    }

    pub fn create_test_session() -> Session {
        Session::new(SessionConfig::default(), sample_catalog(), memory_persistence(MemoryStore::new()))
    }

    #[test]
    fn test_toggle_and_progress() {
        let mut session = create_test_session();
        assert!(session.toggle("01-208-A001", FlagName::OWNED));
        assert!(session.is_flagged("01-208-A001", FlagName::OWNED));

        let progress = session.overall_progress(FlagName::OWNED);
        assert_eq!((progress.owned_count, progress.total, progress.percent), (1, 2, 50));
    }

    #[test]
    fn test_progress_honours_total_override() {
        let mut session = create_test_session();
        session.toggle("01-208-A001", FlagName::OWNED);
        session.set_total_override(Some(4));
        assert_eq!(session.overall_progress(FlagName::OWNED).percent, 25);

        let view = session.filter(&FilterCriteria::default());
        assert_eq!(session.progress(&view, FlagName::OWNED).percent, 50);
    }

    #[test]
    fn test_restore_non_json_gives_empty_state() {
        let store = MemoryStore::with_values([
            ("mhcard.v1.flags", "definitely not json"),
            ("mhcard.v1.notes", "{"),
        ]);
        let session = Session::new(SessionConfig::default(), sample_catalog(), memory_persistence(store));
        assert!(session.collection().state().is_empty());
    }

    #[test]
    fn test_restore_corrupt_legacy_keys_gives_empty_state() {
        let store = MemoryStore::with_values([("ownedIds", "01-208-A001,02-100-A001")]);
        let session = Session::new(SessionConfig::default(), sample_catalog(), memory_persistence(store));
        assert!(session.collection().state().is_empty());
    }

    #[test]
    fn test_restore_legacy_keys() {
        let store = MemoryStore::with_values([
            ("ownedIds", r#"["01-208-A001"]"#),
            ("realIds", r#"["02-100-A001"]"#),
        ]);
        let session = Session::new(SessionConfig::default(), sample_catalog(), memory_persistence(store));
        assert!(session.is_flagged("01-208-A001", FlagName::OWNED));
        assert!(session.is_flagged("02-100-A001", FlagName::REAL));
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let mut store = MemoryStore::new();
        store.set_fail_writes(true);
        let mut session = Session::new(SessionConfig::default(), sample_catalog(), memory_persistence(store));

        assert!(session.toggle("01-208-A001", FlagName::OWNED));
        session.set_note("01-208-A001", "メモ");
        assert!(session.is_flagged("01-208-A001", FlagName::OWNED));
        assert_eq!(session.note("01-208-A001"), Some("メモ"));
    }

    #[test]
    fn test_failed_catalog_load_leaves_empty_catalog() {
        let mut session = create_test_session();
        let result = session.load_catalog(&JsonStrSource::new("not a catalog"));
        assert!(matches!(result, Err(CollectionError::Load(_))));
        assert!(session.catalog().is_empty());
        assert!(session.filter(&FilterCriteria::default()).is_empty());
        assert_eq!(session.overall_progress(FlagName::OWNED).percent, 0);

        assert_eq!(session.load_catalog(&JsonStrSource::new(SAMPLE_JSON)).unwrap(), 2);
        assert_eq!(session.catalog().len(), 2);
    }

    #[test]
    fn test_page_resets_on_criteria_change() {
        let config = SessionConfig { page_size: 1, ..Default::default() };
        let mut session = Session::new(config, sample_catalog(), memory_persistence(MemoryStore::new()));
        let all = FilterCriteria::default();

        assert_eq!(session.page(&all).cards[0].id, "01-208-A001");
        session.pager_mut().next_page();
        assert_eq!(session.page(&all).cards[0].id, "02-100-A001");

        let unowned = FilterCriteria { ownership: OwnershipFilter::Unflagged, ..Default::default() };
        let page = session.page(&unowned);
        assert_eq!(page.index, 0);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn test_csv_round_trip_through_session() {
        let mut session = create_test_session();
        session.toggle("01-208-A001", FlagName::OWNED);
        session.toggle("02-100-A001", FlagName::REAL);
        let expected = session.collection().state().clone();

        let csv = session.export_csv();
        session.collection_mut().reset();
        let report = session.import_csv(&csv);
        assert_eq!(report.rows_matched, 2);
        assert_eq!(session.collection().state(), &expected);
    }

    #[test]
    fn test_links_and_labels() {
        let session = create_test_session();
        let links = session.links("01-208-A001").unwrap();
        assert!(links.map_search.is_some());
        assert!(links.place_search.is_some());
        assert!(session.links("99-999-Z999").is_none());

        assert_eq!(session.flag_label(FlagName::REAL), Some("実物"));
        assert_eq!(session.flag_label(FlagName::FAVORITE), None);
    }

    #[test]
    fn test_open_with_files() {
        let temp = TempDir::new().unwrap();
        let catalog_path = temp.path().join(crate::CATALOG_FILENAME);
        std::fs::write(&catalog_path, SAMPLE_JSON).unwrap();
        let config = SessionConfig {
            catalog_path: Some(catalog_path),
            storage_path: Some(temp.path().join(crate::DATABASE_FILENAME)),
            ..Default::default()
        };

        {
            let mut session = Session::open(&config).unwrap();
            assert_eq!(session.catalog().len(), 2);
            session.toggle("02-100-A001", FlagName::OWNED);
            session.set_note("02-100-A001", "ねぶた祭で入手");
        }

        let session = Session::open(&config).unwrap();
        assert!(session.is_flagged("02-100-A001", FlagName::OWNED));
        assert_eq!(session.note("02-100-A001"), Some("ねぶた祭で入手"));
    }

    #[test]
    fn test_open_with_user_documents() {
        let temp = TempDir::new().unwrap();
        let config = SessionConfig {
            storage_path: Some(temp.path().join(crate::DATABASE_FILENAME)),
            user_id: Some("alice".to_string()),
            ..Default::default()
        };

        {
            let mut session = Session::open(&config).unwrap();
            assert!(session.catalog().is_empty());
            session.toggle("01-208-A001", FlagName::REAL);
        }

        let session = Session::open(&config).unwrap();
        assert!(session.is_flagged("01-208-A001", FlagName::REAL));

        let other = SessionConfig { user_id: Some("bob".to_string()), ..config };
        assert!(Session::open(&other).unwrap().collection().state().is_empty());
    }

    #[test]
    fn test_open_with_missing_catalog() {
        let config = SessionConfig {
            catalog_path: Some("/nonexistent/manhole_cards.json".into()),
            ..Default::default()
        };
        let session = Session::open(&config).unwrap();
        assert!(session.catalog().is_empty());
    }
}
