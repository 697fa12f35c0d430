//! Deterministic identifiers.

use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string.
pub fn stable_uuid(input: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, input.as_bytes())
}

/// Document id derived from the uploaded text.
///
/// Identical uploads map to the same id, so re-uploading replaces the
/// earlier version instead of adding a duplicate.
pub fn stable_doc_id(content: &str) -> String {
    stable_uuid(content).to_string()
}
