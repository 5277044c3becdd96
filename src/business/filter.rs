//! Filter and query engine
//!
//! [`apply`] derives a [`FilteredView`] from the catalog, the collection
//! state and a set of [`FilterCriteria`]. It is a pure function: nothing is
//! cached and the inputs are never modified, so it can be re-run on every
//! keystroke or toggle.

use serde::{Deserialize, Serialize};
use crate::utils::{contains_phrase, TextCollator};
use super::card::{CardRecord, CardType, FlagName};
use super::catalog::Catalog;
use super::collection::CollectionState;

/// Ownership dimension of the criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OwnershipFilter {
    #[default]
    All,
    /// Only cards carrying the ownership flag
    Flagged,
    /// Only cards without the ownership flag
    Unflagged,
}

/// Order of the filtered cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    /// Catalog order
    #[default]
    Catalog,
    /// Prefecture, then city, then id, in Japanese collation order
    Region,
    /// Series number, then series label, then city
    Series,
    /// Cards without the ownership flag first, catalog order otherwise
    UnflaggedFirst,
}

/// User-selected filter dimensions
///
/// The default value constrains nothing. An empty prefecture or series
/// counts as no selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub prefecture: Option<String>,
    /// Series label
    pub series: Option<String>,
    pub card_type: Option<CardType>,
    /// Free text matched against city, id, details and distribution place
    pub search: String,
    pub ownership: OwnershipFilter,
    /// Flag used by the ownership filter and [`SortMode::UnflaggedFirst`]
    pub ownership_flag: FlagName,
    pub sort: SortMode,
}

impl FilterCriteria {
    /// Check if a card passes every dimension
    pub fn matches(&self, card: &CardRecord, state: &CollectionState) -> bool {
        if let Some(prefecture) = selection(&self.prefecture) {
            if card.prefecture != prefecture {
                return false;
            }
        }
        if let Some(series) = selection(&self.series) {
            if card.series.label != series {
                return false;
            }
        }
        if let Some(card_type) = self.card_type {
            if card.card_type != card_type {
                return false;
            }
        }

        let flagged = || state.has(&card.id, self.ownership_flag.as_str());
        let ownership_ok = match self.ownership {
            OwnershipFilter::All => true,
            OwnershipFilter::Flagged => flagged(),
            OwnershipFilter::Unflagged => !flagged(),
        };
        if !ownership_ok {
            return false;
        }

        let phrase = self.search.trim();
        if phrase.is_empty() {
            return true;
        }
        [&card.city, &card.id, &card.details, &card.distribution_place]
            .iter()
            .any(|field| contains_phrase(field, phrase))
    }

    /// Check if the criteria constrain nothing
    pub fn is_unconstrained(&self) -> bool {
        selection(&self.prefecture).is_none()
            && selection(&self.series).is_none()
            && self.card_type.is_none()
            && self.search.trim().is_empty()
            && self.ownership == OwnershipFilter::All
    }
}

fn selection(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Derive the filtered, sorted view of the catalog
pub fn apply<'a>(catalog: &'a Catalog, state: &CollectionState, criteria: &FilterCriteria) -> FilteredView<'a> {
    let mut cards: Vec<&CardRecord> = catalog
        .cards()
        .iter()
        .filter(|card| criteria.matches(card, state))
        .collect();

    // All sorts are stable, ties keep catalog order
    match criteria.sort {
        SortMode::Catalog => {}
        SortMode::Region => {
            let collator = TextCollator::japanese();
            cards.sort_by(|a, b| {
                collator
                    .compare(&a.prefecture, &b.prefecture)
                    .then_with(|| collator.compare(&a.city, &b.city))
                    .then_with(|| collator.compare(&a.id, &b.id))
            });
        }
        SortMode::Series => {
            let collator = TextCollator::japanese();
            cards.sort_by(|a, b| {
                series_key(a)
                    .cmp(&series_key(b))
                    .then_with(|| collator.compare(&a.series.label, &b.series.label))
                    .then_with(|| collator.compare(&a.city, &b.city))
            });
        }
        SortMode::UnflaggedFirst => {
            let flag = criteria.ownership_flag.as_str();
            cards.sort_by_key(|card| state.has(&card.id, flag));
        }
    }

    FilteredView { cards }
}

// Cards without a series number go last
fn series_key(card: &CardRecord) -> (bool, Option<u32>) {
    (card.series.number.is_none(), card.series.number)
}

/// Read-only ordered result of a filter run
#[derive(Debug, Clone, Default)]
pub struct FilteredView<'a> {
    cards: Vec<&'a CardRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn cards(&self) -> &[&'a CardRecord] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a CardRecord> + '_ {
        self.cards.iter().copied()
    }

    /// Ids in view order
    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.cards.iter().map(|card| card.id.as_str())
    }

    /// Partition by prefecture
    ///
    /// Groups appear in order of their first card, cards keep view order
    /// inside each group.
    pub fn group_by_prefecture(&self) -> Vec<PrefectureGroup<'a>> {
        let mut groups: Vec<PrefectureGroup<'a>> = Vec::new();
        for &card in &self.cards {
            match groups.iter_mut().find(|g| g.prefecture == card.prefecture) {
                Some(group) => group.cards.push(card),
                None => groups.push(PrefectureGroup {
                    prefecture: card.prefecture.as_str(),
                    cards: vec![card],
                }),
            }
        }
        groups
    }

    /// Slice out one page
    ///
    /// An index past the last page yields the last page.
    pub fn page(&self, index: usize, size: usize) -> Page<'a> {
        let size = size.max(1);
        let total_pages = self.cards.len().div_ceil(size).max(1);
        let index = index.min(total_pages - 1);
        let start = index * size;
        let end = (start + size).min(self.cards.len());

        Page {
            index,
            size,
            total_pages,
            total_items: self.cards.len(),
            cards: self.cards[start.min(end)..end].to_vec(),
        }
    }
}

impl<'a> IntoIterator for FilteredView<'a> {
    type Item = &'a CardRecord;
    type IntoIter = std::vec::IntoIter<&'a CardRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.into_iter()
    }
}

/// Cards of one prefecture
#[derive(Debug, Clone, PartialEq)]
pub struct PrefectureGroup<'a> {
    pub prefecture: &'a str,
    pub cards: Vec<&'a CardRecord>,
}

/// One page of a filtered view
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    /// Zero-based page index
    pub index: usize,
    pub size: usize,
    /// Always at least 1, an empty view has one empty page
    pub total_pages: usize,
    pub total_items: usize,
    pub cards: Vec<&'a CardRecord>,
}

impl Page<'_> {
    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.total_pages
    }
}

/// Current page position, reset whenever the criteria change
#[derive(Debug, Clone)]
pub struct Pager {
    page_size: usize,
    current: usize,
    criteria: Option<FilterCriteria>,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current: 0,
            criteria: None,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Record the criteria in use; returns true when they changed and the
    /// pager went back to the first page
    pub fn sync(&mut self, criteria: &FilterCriteria) -> bool {
        if self.criteria.as_ref() == Some(criteria) {
            return false;
        }
        self.criteria = Some(criteria.clone());
        self.current = 0;
        true
    }

    pub fn set_page(&mut self, index: usize) {
        self.current = index;
    }

    pub fn next_page(&mut self) {
        self.current += 1;
    }

    pub fn previous_page(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Current page of a view, clamping the position to the last page
    pub fn page<'a>(&mut self, view: &FilteredView<'a>) -> Page<'a> {
        let page = view.page(self.current, self.page_size);
        self.current = page.index;
        page
    }
}
