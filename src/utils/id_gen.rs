//! ID generation utilities

/// Generate a store ID (32 characters, UUID-like)
pub fn generate_store_id() -> String {
    uuid::Uuid::new_v4().to_string().replace("-", "")
}

/// Build the persisted document ID for a flag on a card
pub fn flag_document_id(flag: &str, card_id: &str) -> String {
    format!("{}{}:{}", crate::FLAG_DOC_PREFIX, flag, card_id)
}

/// Build the persisted document ID for a card note
pub fn memo_document_id(card_id: &str) -> String {
    format!("{}{}", crate::MEMO_DOC_PREFIX, card_id)
}
