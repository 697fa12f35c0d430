//! POST /documents: chunk and index one document.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use contextor::Document;
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::documents::document_request::{UploadDocumentRequest, UploadDocumentResponse},
};

/// Handler: POST /documents
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/documents \
///   -H 'content-type: application/json' \
///   -d '{"doc_id":"auth","content":"Auth: use Bearer tokens in the Authorization header."}'
/// ```
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UploadDocumentRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = payload?;
    req.validate().map_err(AppError::BadRequest)?;

    let doc_id = match req.doc_id {
        Some(id) => id.trim().to_string(),
        None => services::stable_doc_id(&req.content),
    };
    debug!(doc_id = %doc_id, chars = req.content.len(), "upload_document: start");

    let report = state
        .rag
        .ingest(Document {
            doc_id,
            text: req.content,
            metadata: req.metadata.unwrap_or_default(),
        })
        .await?;

    let body = UploadDocumentResponse {
        message: format!("Document processed into {} chunks", report.chunks_created),
        doc_id: report.doc_id,
        chunks_created: report.chunks_created,
        replaced: report.replaced,
    };
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::CREATED))
}
