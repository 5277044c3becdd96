//! Collection progress aggregates

use std::collections::HashSet;
use serde::Serialize;
use super::collection::CollectionState;
use super::filter::FilteredView;

/// Flagged cards out of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub owned_count: usize,
    pub total: usize,
    /// Rounded percentage, 0 when the total is 0
    pub percent: u32,
}

impl Progress {
    /// Build from raw counts
    pub fn from_counts(owned_count: usize, total: usize) -> Self {
        Self {
            owned_count,
            total,
            percent: percent(owned_count, total),
        }
    }

    /// Count the ids in scope that appear in the flag set
    ///
    /// Flagged ids outside the scope are not counted.
    pub fn compute<'a>(ids_in_scope: impl IntoIterator<Item = &'a str>, flagged: Option<&HashSet<String>>) -> Self {
        let mut owned_count = 0;
        let mut total = 0;
        for id in ids_in_scope {
            total += 1;
            if flagged.is_some_and(|set| set.contains(id)) {
                owned_count += 1;
            }
        }
        Self::from_counts(owned_count, total)
    }

    /// Replace the total with a user override, when one is set
    pub fn with_total(self, total_override: Option<u32>) -> Self {
        match total_override {
            Some(total) => Self::from_counts(self.owned_count, total as usize),
            None => self,
        }
    }

    /// Cards still missing
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.owned_count)
    }
}

/// `round(100 * owned / total)` with halves rounded up, capped at 100
fn percent(owned: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (owned * 200 + total) / (total * 2);
    rounded.min(100) as u32
}

/// Progress of one prefecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefectureProgress<'a> {
    pub prefecture: &'a str,
    pub progress: Progress,
}

/// Progress per prefecture of a view, in order of first appearance
pub fn prefecture_progress<'a>(view: &FilteredView<'a>, state: &CollectionState, flag: &str) -> Vec<PrefectureProgress<'a>> {
    let flagged = state.flagged(flag);
    view.group_by_prefecture()
        .into_iter()
        .map(|group| PrefectureProgress {
            prefecture: group.prefecture,
            progress: Progress::compute(group.cards.iter().map(|c| c.id.as_str()), flagged),
        })
        .collect()
}
