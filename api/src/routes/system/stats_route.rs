use std::sync::Arc;

use axum::{Json, extract::State};
use contextor::StatsReport;

use crate::core::app_state::AppState;

/// GET /stats: fragment and document counts of the active index.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsReport> {
    Json(state.rag.stats().await)
}
