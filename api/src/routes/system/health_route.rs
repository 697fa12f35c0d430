use std::sync::Arc;

use axum::{Json, extract::State};
use contextor::HealthReport;

use crate::core::app_state::AppState;

/// GET /health: always 200; `status` says `healthy` or `degraded`.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.rag.health().await)
}
