//! Collection state
//!
//! Per-user flags, notes and the optional total override. [`CollectionState`]
//! is plain data; [`Collection`] owns it together with the persistence
//! backend and writes every mutation through.

use std::collections::{BTreeMap, HashMap, HashSet};
use serde::{Deserialize, Serialize};
use crate::error::{CollectionError, Result};
use crate::export::{self, CsvLayout, ImportReport};
use crate::storage::Persistence;
use crate::SNAPSHOT_VERSION;
use super::card::FlagName;
use super::catalog::Catalog;

/// Flags, notes and settings of a single user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    flags: HashMap<FlagName, HashSet<String>>,
    notes: HashMap<String, String>,
    total_override: Option<u32>,
}

impl CollectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a card has a flag set
    pub fn has(&self, card_id: &str, flag: &str) -> bool {
        self.flags.get(flag).is_some_and(|ids| ids.contains(card_id))
    }

    /// Flip a flag, returning the new value
    pub fn toggle(&mut self, card_id: &str, flag: &str) -> bool {
        let value = !self.has(card_id, flag);
        self.set(card_id, flag, value);
        value
    }

    /// Set or clear a flag, returning whether anything changed
    pub fn set(&mut self, card_id: &str, flag: &str, value: bool) -> bool {
        if value {
            return self
                .flags
                .entry(FlagName::new(flag))
                .or_default()
                .insert(card_id.to_string());
        }

        let Some(ids) = self.flags.get_mut(flag) else {
            return false;
        };
        let removed = ids.remove(card_id);
        if ids.is_empty() {
            self.flags.remove(flag);
        }
        removed
    }

    /// Ids carrying a flag
    pub fn flagged(&self, flag: &str) -> Option<&HashSet<String>> {
        self.flags.get(flag)
    }

    /// Number of ids carrying a flag (including ids not in the catalog)
    pub fn count(&self, flag: &str) -> usize {
        self.flags.get(flag).map_or(0, HashSet::len)
    }

    /// Names of all flags with at least one id, sorted
    pub fn flag_names(&self) -> Vec<&FlagName> {
        let mut names: Vec<&FlagName> = self.flags.keys().collect();
        names.sort();
        names
    }

    /// Note for a card, `None` when there is none
    pub fn note(&self, card_id: &str) -> Option<&str> {
        self.notes.get(card_id).map(String::as_str)
    }

    /// Overwrite the note for a card, an empty text removes it
    ///
    /// Returns whether anything changed.
    pub fn set_note(&mut self, card_id: &str, text: &str) -> bool {
        if text.is_empty() {
            return self.notes.remove(card_id).is_some();
        }
        match self.notes.get(card_id) {
            Some(existing) if existing == text => false,
            _ => {
                self.notes.insert(card_id.to_string(), text.to_string());
                true
            }
        }
    }

    pub fn notes(&self) -> &HashMap<String, String> {
        &self.notes
    }

    pub fn total_override(&self) -> Option<u32> {
        self.total_override
    }

    pub fn set_total_override(&mut self, total: Option<u32>) {
        self.total_override = total;
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.notes.is_empty() && self.total_override.is_none()
    }

    pub fn clear(&mut self) {
        self.flags.clear();
        self.notes.clear();
        self.total_override = None;
    }

    /// Sorted, serializable copy of the state
    pub fn to_snapshot(&self) -> CollectionSnapshot {
        let flags = self
            .flags
            .iter()
            .map(|(flag, ids)| {
                let mut ids: Vec<String> = ids.iter().cloned().collect();
                ids.sort();
                (flag.to_string(), ids)
            })
            .collect();

        CollectionSnapshot {
            version: SNAPSHOT_VERSION,
            flags,
            notes: self.notes.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            total_override: self.total_override,
        }
    }

    /// Rebuild state from a snapshot, dropping empty flag sets and notes
    pub fn from_snapshot(snapshot: CollectionSnapshot) -> Self {
        let mut state = Self::new();
        for (flag, ids) in snapshot.flags {
            for id in ids {
                state.set(&id, &flag, true);
            }
        }
        for (card_id, text) in snapshot.notes {
            state.set_note(&card_id, &text);
        }
        state.total_override = snapshot.total_override;
        state
    }
}

/// Portable form of the full collection state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSnapshot {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub flags: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    #[serde(default)]
    pub total_override: Option<u32>,
}

/// Collection state bound to its persistence backend
pub struct Collection {
    state: CollectionState,
    persistence: Box<dyn Persistence>,
}

impl Collection {
    /// Create an empty collection, call [`Collection::restore`] to load saved state
    pub fn new(persistence: Box<dyn Persistence>) -> Self {
        Self {
            state: CollectionState::new(),
            persistence,
        }
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    /// Check if a card has a flag set
    pub fn is_flagged(&self, card_id: &str, flag: &str) -> bool {
        self.state.has(card_id, flag)
    }

    /// Replace the in-memory state with what the backend holds
    ///
    /// Unreadable or corrupt data leaves an empty collection behind, and the
    /// backend is overwritten with it so later changes survive a restart.
    pub fn restore(&mut self) {
        match self.persistence.load() {
            Ok(state) => {
                log::info!(
                    "Restored collection: {} flags, {} notes",
                    state.flag_names().len(),
                    state.notes().len()
                );
                self.state = state;
            }
            Err(e) => {
                log::warn!("Discarding persisted collection: {e}");
                self.state = CollectionState::new();
                let result = self.persistence.write_all(&self.state);
                Self::log_write_failure(result);
            }
        }
    }

    fn accepts_flag(flag: &str) -> bool {
        if FlagName::is_valid(flag) {
            return true;
        }
        log::warn!("Ignoring change to invalid flag name {flag:?}");
        false
    }

    /// Flip a flag on a card, returning the new value
    ///
    /// Invalid flag names (empty or containing `:`) are ignored and report `false`.
    pub fn toggle(&mut self, card_id: &str, flag: &str) -> bool {
        if !Self::accepts_flag(flag) {
            return false;
        }
        let value = self.state.toggle(card_id, flag);
        log::debug!("Toggled {flag} for {card_id}: {value}");
        let result = self.persistence.write_flag(&self.state, flag, card_id);
        Self::log_write_failure(result);
        value
    }

    /// Set or clear a flag on a card
    pub fn set_flag(&mut self, card_id: &str, flag: &str, value: bool) {
        if Self::accepts_flag(flag) && self.state.set(card_id, flag, value) {
            let result = self.persistence.write_flag(&self.state, flag, card_id);
            Self::log_write_failure(result);
        }
    }

    /// Overwrite the note for a card, an empty text removes it
    pub fn set_note(&mut self, card_id: &str, text: &str) {
        if self.state.set_note(card_id, text) {
            let result = self.persistence.write_note(&self.state, card_id);
            Self::log_write_failure(result);
        }
    }

    pub fn set_total_override(&mut self, total: Option<u32>) {
        self.state.set_total_override(total);
        let result = self.persistence.write_total_override(&self.state);
        Self::log_write_failure(result);
    }

    /// Forget every flag, note and setting
    pub fn reset(&mut self) {
        self.state.clear();
        let result = self.persistence.write_all(&self.state);
        Self::log_write_failure(result);
    }

    /// Export flags as CSV grouped by municipality and number
    pub fn export_csv(&self, catalog: &Catalog, layout: &CsvLayout) -> String {
        export::export_csv(catalog, &self.state, layout)
    }

    /// Import flags from CSV; rows that match no group are skipped
    pub fn import_csv(&mut self, catalog: &Catalog, layout: &CsvLayout, text: &str) -> ImportReport {
        let report = export::import_csv(catalog, &mut self.state, layout, text);
        for skipped in &report.skipped {
            log::warn!("CSV import: {skipped}");
        }
        if report.flags_changed > 0 {
            let result = self.persistence.write_all(&self.state);
            Self::log_write_failure(result);
        }
        report
    }

    /// Export the full state (flags, notes, total override) as JSON
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.state.to_snapshot())?)
    }

    /// Replace the full state with a JSON snapshot
    ///
    /// Fails without touching the current state when the text is not a snapshot.
    pub fn import_json(&mut self, text: &str) -> Result<()> {
        let snapshot: CollectionSnapshot = serde_json::from_str(text)
            .map_err(|e| CollectionError::ImportFormat { line: e.line(), reason: e.to_string() })?;
        if let Some(flag) = snapshot.flags.keys().find(|f| !FlagName::is_valid(f)) {
            return Err(CollectionError::ImportFormat {
                line: 0,
                reason: format!("invalid flag name {flag:?}"),
            });
        }
        self.state = CollectionState::from_snapshot(snapshot);
        let result = self.persistence.write_all(&self.state);
        Self::log_write_failure(result);
        Ok(())
    }

    fn log_write_failure(result: Result<()>) {
        if let Err(e) = result {
            log::warn!("Collection change kept in memory only: {e}");
        }
    }
}
