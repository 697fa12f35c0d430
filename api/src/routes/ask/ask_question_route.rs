//! POST /ask: answers a question with retrieved documentation context.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use chrono::{SecondsFormat, Utc};
use contextor::Query;
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::{AppError, AppResult},
    routes::ask::ask_request::{AskRequest, AskResponse},
};

/// Handler: POST /ask
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/ask \
///   -H 'content-type: application/json' \
///   -d '{"question":"How do I authenticate?","temperature":0.2}'
/// ```
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = payload?;
    req.validate().map_err(AppError::BadRequest)?;

    let request_id = headers
        .get("X-Request-Id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-");
    debug!(request_id = %request_id, question = %req.question, "ask_question: start");

    let question = req.question.trim().to_string();
    let qa = state
        .rag
        .answer(Query {
            question: question.clone(),
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_k: req.top_k,
        })
        .await?;

    debug!(
        request_id = %request_id,
        sources = qa.answer.sources.len(),
        "ask_question: success"
    );

    let body = AskResponse {
        question,
        answer: qa.answer.text,
        sources: qa.answer.sources,
        context: qa.context,
        token_count: qa.answer.token_count,
        model_used: qa.model_used,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    Ok(ApiResponse::success(body).into_response_with_status(StatusCode::OK))
}
