//! Locale-aware string ordering

use std::cmp::Ordering;
use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;

/// Orders strings the way a Japanese reader expects
///
/// Kanji sort by reading order instead of code point, so 青森県 comes
/// before 東京都 and 北海道. Strings the collator considers equal fall back
/// to code point order to keep the result total.
pub struct TextCollator {
    collator: Option<Collator>,
}

impl TextCollator {
    pub fn japanese() -> Self {
        let collator = match Collator::try_new(&locale!("ja").into(), CollatorOptions::new()) {
            Ok(collator) => Some(collator),
            Err(e) => {
                log::warn!("Japanese collation unavailable, sorting by code point: {e:?}");
                None
            }
        };
        Self { collator }
    }

    pub fn compare(&self, left: &str, right: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(left, right).then_with(|| left.cmp(right)),
            None => left.cmp(right),
        }
    }
}
