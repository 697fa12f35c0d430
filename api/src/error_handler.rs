use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::{ContextorError, FailureClass};
use thiserror::Error;
use tracing::{error, warn};

use crate::core::http::response_envelope::ApiResponse;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("startup failed: {0}")]
    Startup(#[source] ContextorError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / pipeline ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Rag(#[from] ContextorError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Startup(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Rag(e) => rag_status(e),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Startup(_) => "STARTUP_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Rag(e) => match e {
                ContextorError::InvalidArgument(_) => "BAD_REQUEST",
                ContextorError::NotFound(_) => "NOT_FOUND",
                ContextorError::InvalidConfiguration(_) => "CONFIG_ERROR",
                ContextorError::ConfigurationMismatch(_) => "CONFIGURATION_MISMATCH",
                ContextorError::IngestionFailed { .. } => "INGESTION_FAILED",
                ContextorError::GenerationFailed { .. } => "GENERATION_FAILED",
                ContextorError::Timeout { .. } => "TIMEOUT",
                ContextorError::Cancelled => "CANCELLED",
                ContextorError::Retrieval(_) => "RETRIEVAL_FAILED",
            },
        }
    }
}

/// Retryable provider trouble is 503, a provider refusing us is 502.
fn rag_status(e: &ContextorError) -> StatusCode {
    match e {
        ContextorError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ContextorError::NotFound(_) => StatusCode::NOT_FOUND,
        ContextorError::GenerationFailed { kind, .. } => match kind {
            FailureClass::RateLimited | FailureClass::Transient => StatusCode::SERVICE_UNAVAILABLE,
            FailureClass::AuthFailed | FailureClass::Other => StatusCode::BAD_GATEWAY,
        },
        ContextorError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        e if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        } else {
            warn!(code = self.error_code(), error = %self, "request rejected");
        }
        ApiResponse::<()>::error(self.error_code(), self.to_string()).into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(err: axum::extract::rejection::PathRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}
