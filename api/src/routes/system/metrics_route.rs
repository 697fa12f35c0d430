use std::sync::Arc;

use axum::{Json, extract::State};
use contextor::MetricsSnapshot;

use crate::core::app_state::AppState;

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.rag.metrics())
}
