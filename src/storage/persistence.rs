//! Collection persistence on top of the storage shapes

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use crate::business::{CollectionState, FlagName};
use crate::error::{CollectionError, Result};
use crate::utils::{flag_document_id, memo_document_id};
use crate::{FLAG_DOC_PREFIX, LEGACY_OWNED_KEY, LEGACY_REAL_KEY, MEMO_DOC_PREFIX, TOTAL_DOC_ID};
use super::{FlagDocumentStore, KeyValueStore, Persistence};

fn parse_value<T: DeserializeOwned>(key: &str, text: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| CollectionError::PersistenceRead(format!("{key}: {e}")))
}

fn read_error(err: CollectionError) -> CollectionError {
    match err {
        CollectionError::PersistenceRead(_) => err,
        other => CollectionError::PersistenceRead(other.to_string()),
    }
}

fn sorted_ids(state: &CollectionState, flag: &str) -> Vec<String> {
    let mut ids: Vec<String> = state
        .flagged(flag)
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default();
    ids.sort();
    ids
}

/// Collection state saved as JSON strings under versioned keys
///
/// Layout for prefix `p`:
/// - `p.flags`: JSON array of flag names in use
/// - `p.flags.<flag>`: JSON array of card ids
/// - `p.notes`: JSON object card id → text
/// - `p.total`: JSON number
pub struct KeyValuePersistence<S: KeyValueStore> {
    store: S,
    prefix: String,
    written_index: Option<Vec<String>>,
}

impl<S: KeyValueStore> KeyValuePersistence<S> {
    pub fn new(store: S, prefix: &str) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
            written_index: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn index_key(&self) -> String {
        format!("{}.flags", self.prefix)
    }

    fn flag_key(&self, flag: &str) -> String {
        format!("{}.flags.{}", self.prefix, flag)
    }

    fn notes_key(&self) -> String {
        format!("{}.notes", self.prefix)
    }

    fn total_key(&self) -> String {
        format!("{}.total", self.prefix)
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).map_err(read_error)
    }

    /// Read the unversioned id arrays written by earlier releases
    fn load_legacy(&self, state: &mut CollectionState) -> Result<bool> {
        let mut found = false;
        for (key, flag) in [(LEGACY_OWNED_KEY, FlagName::OWNED), (LEGACY_REAL_KEY, FlagName::REAL)] {
            if let Some(text) = self.read(key)? {
                let ids: Vec<String> = parse_value(key, &text)?;
                for id in ids {
                    state.set(&id, flag, true);
                }
                found = true;
            }
        }
        Ok(found)
    }

    fn write_index(&mut self, state: &CollectionState) -> Result<()> {
        let names: Vec<String> = state.flag_names().iter().map(|f| f.to_string()).collect();
        if self.written_index.as_ref() == Some(&names) {
            return Ok(());
        }
        let key = self.index_key();
        self.store.set(&key, &serde_json::to_string(&names)?)?;
        self.written_index = Some(names);
        Ok(())
    }

    fn write_flag_set(&mut self, state: &CollectionState, flag: &str) -> Result<()> {
        let key = self.flag_key(flag);
        let ids = sorted_ids(state, flag);
        if ids.is_empty() {
            self.store.remove(&key)
        } else {
            self.store.set(&key, &serde_json::to_string(&ids)?)
        }
    }
}

impl<S: KeyValueStore> Persistence for KeyValuePersistence<S> {
    fn load(&mut self) -> Result<CollectionState> {
        let mut state = CollectionState::new();

        let index_key = self.index_key();
        match self.read(&index_key)? {
            Some(text) => {
                let names: Vec<String> = parse_value(&index_key, &text)?;
                for name in &names {
                    let key = self.flag_key(name);
                    if let Some(text) = self.read(&key)? {
                        let ids: Vec<String> = parse_value(&key, &text)?;
                        for id in ids {
                            state.set(&id, name, true);
                        }
                    }
                }
            }
            None => {
                if self.load_legacy(&mut state)? {
                    log::info!("Migrating legacy collection keys to {}", self.prefix);
                    if let Err(e) = self.write_all(&state) {
                        log::warn!("Legacy collection keys not migrated: {e}");
                    }
                }
            }
        }

        let notes_key = self.notes_key();
        if let Some(text) = self.read(&notes_key)? {
            let notes: HashMap<String, String> = parse_value(&notes_key, &text)?;
            for (card_id, note) in notes {
                state.set_note(&card_id, &note);
            }
        }

        let total_key = self.total_key();
        if let Some(text) = self.read(&total_key)? {
            let total: Option<u32> = parse_value(&total_key, &text)?;
            state.set_total_override(total);
        }

        self.written_index = Some(state.flag_names().iter().map(|f| f.to_string()).collect());
        Ok(state)
    }

    fn write_flag(&mut self, state: &CollectionState, flag: &str, _card_id: &str) -> Result<()> {
        self.write_flag_set(state, flag)?;
        self.write_index(state)
    }

    fn write_note(&mut self, state: &CollectionState, _card_id: &str) -> Result<()> {
        let key = self.notes_key();
        if state.notes().is_empty() {
            return self.store.remove(&key);
        }
        let notes: std::collections::BTreeMap<&String, &String> = state.notes().iter().collect();
        self.store.set(&key, &serde_json::to_string(&notes)?)
    }

    fn write_total_override(&mut self, state: &CollectionState) -> Result<()> {
        let key = self.total_key();
        match state.total_override() {
            Some(total) => self.store.set(&key, &total.to_string()),
            None => self.store.remove(&key),
        }
    }

    fn write_all(&mut self, state: &CollectionState) -> Result<()> {
        let index_key = self.index_key();
        let previous: Vec<String> = self
            .store
            .get(&index_key)?
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        for name in previous {
            if state.flagged(&name).is_none() {
                let key = self.flag_key(&name);
                self.store.remove(&key)?;
            }
        }

        for name in state.flag_names() {
            self.write_flag_set(state, name.as_str())?;
        }
        self.written_index = None;
        self.write_index(state)?;
        self.write_note(state, "")?;
        self.write_total_override(state)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlagDocument {
    card_id: String,
    flag: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoDocument {
    card_id: String,
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TotalDocument {
    value: u32,
}

/// Collection state saved as one document per set flag
///
/// Document IDs are `flag:<flag>:<card id>`, `memo:<card id>` and
/// `setting:total`. A document whose ID has none of these prefixes is the
/// layout used before flags were generalised: its presence marks the card
/// named by the ID as owned. Such documents are rewritten on load.
pub struct DocumentPersistence<D: FlagDocumentStore> {
    store: D,
    user_id: String,
}

impl<D: FlagDocumentStore> DocumentPersistence<D> {
    pub fn new(store: D, user_id: &str) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn into_inner(self) -> D {
        self.store
    }

    fn documents_for(state: &CollectionState) -> Result<HashMap<String, String>> {
        let mut documents = HashMap::new();
        for flag in state.flag_names() {
            for card_id in sorted_ids(state, flag.as_str()) {
                let body = serde_json::to_string(&FlagDocument {
                    card_id: card_id.clone(),
                    flag: flag.to_string(),
                })?;
                documents.insert(flag_document_id(flag.as_str(), &card_id), body);
            }
        }
        for (card_id, text) in state.notes() {
            let body = serde_json::to_string(&MemoDocument {
                card_id: card_id.clone(),
                text: text.clone(),
            })?;
            documents.insert(memo_document_id(card_id), body);
        }
        if let Some(value) = state.total_override() {
            documents.insert(TOTAL_DOC_ID.to_string(), serde_json::to_string(&TotalDocument { value })?);
        }
        Ok(documents)
    }
}

impl<D: FlagDocumentStore> Persistence for DocumentPersistence<D> {
    fn load(&mut self) -> Result<CollectionState> {
        let documents = self.store.list(&self.user_id).map_err(read_error)?;
        let mut state = CollectionState::new();
        let mut legacy = 0;

        for doc in documents {
            if let Some(rest) = doc.doc_id.strip_prefix(FLAG_DOC_PREFIX) {
                match rest.split_once(':') {
                    Some((flag, card_id)) if !flag.is_empty() && !card_id.is_empty() => {
                        state.set(card_id, flag, true);
                    }
                    _ => log::warn!("Ignoring malformed flag document {}", doc.doc_id),
                }
            } else if let Some(card_id) = doc.doc_id.strip_prefix(MEMO_DOC_PREFIX) {
                let memo: MemoDocument = parse_value(&doc.doc_id, &doc.body)?;
                state.set_note(card_id, &memo.text);
            } else if doc.doc_id == TOTAL_DOC_ID {
                let total: TotalDocument = parse_value(&doc.doc_id, &doc.body)?;
                state.set_total_override(Some(total.value));
            } else if !doc.doc_id.is_empty() {
                state.set(&doc.doc_id, FlagName::OWNED, true);
                legacy += 1;
            }
        }

        if legacy > 0 {
            log::info!("Migrating {legacy} legacy card documents of {}", self.user_id);
            if let Err(e) = self.write_all(&state) {
                log::warn!("Legacy card documents not migrated: {e}");
            }
        }

        Ok(state)
    }

    fn write_flag(&mut self, state: &CollectionState, flag: &str, card_id: &str) -> Result<()> {
        let doc_id = flag_document_id(flag, card_id);
        if state.has(card_id, flag) {
            let body = serde_json::to_string(&FlagDocument {
                card_id: card_id.to_string(),
                flag: flag.to_string(),
            })?;
            self.store.put(&self.user_id, &doc_id, &body)
        } else {
            self.store.delete(&self.user_id, &doc_id)
        }
    }

    fn write_note(&mut self, state: &CollectionState, card_id: &str) -> Result<()> {
        let doc_id = memo_document_id(card_id);
        match state.note(card_id) {
            Some(text) => {
                let body = serde_json::to_string(&MemoDocument {
                    card_id: card_id.to_string(),
                    text: text.to_string(),
                })?;
                self.store.put(&self.user_id, &doc_id, &body)
            }
            None => self.store.delete(&self.user_id, &doc_id),
        }
    }

    fn write_total_override(&mut self, state: &CollectionState) -> Result<()> {
        match state.total_override() {
            Some(value) => {
                let body = serde_json::to_string(&TotalDocument { value })?;
                self.store.put(&self.user_id, TOTAL_DOC_ID, &body)
            }
            None => self.store.delete(&self.user_id, TOTAL_DOC_ID),
        }
    }

    fn write_all(&mut self, state: &CollectionState) -> Result<()> {
        let wanted = Self::documents_for(state)?;
        for doc in self.store.list(&self.user_id)? {
            if !wanted.contains_key(&doc.doc_id) {
                self.store.delete(&self.user_id, &doc.doc_id)?;
            }
        }
        for (doc_id, body) in &wanted {
            self.store.put(&self.user_id, doc_id, body)?;
        }
        Ok(())
    }
}
