use contextor::Metadata;
use serde::{Deserialize, Serialize};

/// Request payload for `POST /documents`.
#[derive(Debug, Deserialize)]
pub struct UploadDocumentRequest {
    /// Raw documentation text.
    pub content: String,
    /// Optional caller-chosen id; derived from `content` when omitted.
    #[serde(default)]
    pub doc_id: Option<String>,
    /// Scalar key/value pairs copied onto every fragment.
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl UploadDocumentRequest {
    /// Checks what the pipeline does not: non-blank content, scalar metadata.
    pub fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("content must not be empty".into());
        }
        if let Some(id) = &self.doc_id {
            if id.trim().is_empty() {
                return Err("doc_id must not be blank".into());
            }
        }
        if let Some(meta) = &self.metadata {
            if let Some((k, _)) = meta.iter().find(|(_, v)| v.is_array() || v.is_object()) {
                return Err(format!("metadata `{k}` must be a scalar value"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    pub message: String,
    pub doc_id: String,
    pub chunks_created: usize,
    pub replaced: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteDocumentResponse {
    pub doc_id: String,
    pub fragments_removed: usize,
}
