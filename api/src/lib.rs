//! HTTP boundary for the documentation Q&A backend.
//!
//! Routes:
//! - `POST /documents`, `DELETE /documents/{doc_id}`
//! - `POST /ask`
//! - `GET /stats`, `GET /health`, `GET /metrics`

use std::{env, sync::Arc};

pub mod core;
pub mod error_handler;
mod routes;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use crate::core::app_state::AppState;
pub use crate::error_handler::{AppError, AppResult};
use crate::routes::{
    ask::ask_question_route::ask_question,
    documents::{delete_document_route::delete_document, upload_document_route::upload_document},
    system::{health_route::health, metrics_route::metrics, stats_route::stats},
};

const DEFAULT_ADDRESS: &str = "0.0.0.0:8000";

/// Builds the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/documents", post(upload_document))
        .route("/documents/{doc_id}", delete(delete_document))
        .route("/ask", post(ask_question))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the pipeline from the environment and serves until Ctrl+C,
/// then flushes the index.
pub async fn start() -> Result<(), AppError> {
    let addr = env::var("API_ADDRESS")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

    let state = Arc::new(AppState::from_env()?);
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AppError::Bind)?;
    info!(%addr, model = state.rag.model_name(), "listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    state.rag.shutdown().await?;
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use contextor::{IndexKind, RagOrchestrator, RagSettings};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let mut s = RagSettings::new_default(IndexKind::Lexical);
        s.chunk_size = 50;
        s.chunk_overlap = 10;
        let rag = RagOrchestrator::from_settings(s).unwrap();
        router(Arc::new(AppState::new(rag)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    const AUTH_DOC: &str =
        "Auth: use Bearer tokens in the Authorization header. Rate limit: 100/hr.";

    #[tokio::test]
    async fn upload_then_ask_cites_the_document() {
        let app = app();
        let (st, body) = call(
            &app,
            "POST",
            "/documents",
            Some(json!({"doc_id": "d1", "content": AUTH_DOC})),
        )
        .await;
        assert_eq!(st, StatusCode::CREATED);
        assert_eq!(body["success"], json!(true));
        assert!(body["data"]["chunks_created"].as_u64().unwrap() >= 2);

        let (st, body) = call(
            &app,
            "POST",
            "/ask",
            Some(json!({"question": "How do I authenticate?"})),
        )
        .await;
        assert_eq!(st, StatusCode::OK);
        assert_eq!(body["data"]["sources"], json!(["d1"]));
        assert!(body["data"]["answer"].as_str().unwrap().contains("Bearer tokens"));
        assert_eq!(body["data"]["token_count"], json!(0));
        assert_eq!(body["data"]["model_used"], json!("mock"));

        let (st, body) = call(&app, "GET", "/stats", None).await;
        assert_eq!(st, StatusCode::OK);
        assert_eq!(body["document_count"], json!(1));
        assert_eq!(body["backend"], json!("lexical"));
    }

    #[tokio::test]
    async fn generated_ids_are_stable() {
        let app = app();
        let upload = json!({"content": "Webhooks are signed with HMAC."});
        let (_, first) = call(&app, "POST", "/documents", Some(upload.clone())).await;
        let (_, second) = call(&app, "POST", "/documents", Some(upload)).await;
        assert_eq!(first["data"]["doc_id"], second["data"]["doc_id"]);
        assert_eq!(second["data"]["replaced"], json!(true));
    }

    #[tokio::test]
    async fn validation_failures_are_400() {
        let app = app();
        let (st, body) = call(&app, "POST", "/documents", Some(json!({"content": "   "}))).await;
        assert_eq!(st, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));

        let (st, _) = call(&app, "POST", "/ask", Some(json!({"question": "hi"}))).await;
        assert_eq!(st, StatusCode::BAD_REQUEST);

        let (st, _) = call(
            &app,
            "POST",
            "/ask",
            Some(json!({"question": "How do I paginate?", "temperature": 3.0})),
        )
        .await;
        assert_eq!(st, StatusCode::BAD_REQUEST);

        let (st, _) = call(&app, "POST", "/ask", Some(json!({"nope": 1}))).await;
        assert_eq!(st, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_known_and_unknown() {
        let app = app();
        call(&app, "POST", "/documents", Some(json!({"doc_id": "d1", "content": AUTH_DOC}))).await;

        let (st, body) = call(&app, "DELETE", "/documents/missing", None).await;
        assert_eq!(st, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], json!("NOT_FOUND"));

        let (st, body) = call(&app, "DELETE", "/documents/d1", None).await;
        assert_eq!(st, StatusCode::OK);
        assert_eq!(body["data"]["doc_id"], json!("d1"));

        let (_, metrics) = call(&app, "GET", "/metrics", None).await;
        assert_eq!(metrics["documents_deleted"], json!(1));
        assert_eq!(metrics["documents_ingested"], json!(1));
    }

    #[tokio::test]
    async fn health_is_healthy_with_mock() {
        let (st, body) = call(&app(), "GET", "/health", None).await;
        assert_eq!(st, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
    }
}
