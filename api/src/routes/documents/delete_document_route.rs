//! DELETE /documents/{doc_id}

use std::sync::Arc;

use axum::{
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::Response,
};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppResult,
    routes::documents::document_request::DeleteDocumentResponse,
};

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Response> {
    let Path(doc_id) = path?;
    let fragments_removed = state.rag.delete(&doc_id).await?;
    let body = DeleteDocumentResponse {
        doc_id,
        fragments_removed,
    };
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}
