use contextor::{RagOrchestrator, RagSettings};

use crate::error_handler::AppError;

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// The one pipeline instance; flushed on shutdown.
    pub rag: RagOrchestrator,
}

impl AppState {
    pub fn new(rag: RagOrchestrator) -> Self {
        Self { rag }
    }

    /// Builds the pipeline from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        let settings = RagSettings::from_env().map_err(AppError::Startup)?;
        let rag = RagOrchestrator::from_settings(settings).map_err(AppError::Startup)?;
        Ok(Self::new(rag))
    }
}
