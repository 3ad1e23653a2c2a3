//! Processing history endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::HistoryResponse;

/// GET /api/v1/history - Recently processed documents, most recent first
pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(state.engine().history().into())
}
