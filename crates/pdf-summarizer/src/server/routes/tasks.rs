//! Task status and statistics endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{StatsResponse, TaskId, TaskStatusResponse};

/// GET /api/v1/status/:task_id - Poll a task
///
/// Ids that do not parse are reported as not found, like any other unknown id.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>> {
    let id: TaskId = task_id
        .parse()
        .map_err(|_| Error::TaskNotFound(task_id.clone()))?;

    let task = state.engine().status(id)?;
    Ok(Json(task.into()))
}

/// GET /api/v1/stats - Task counts and backend details
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let engine = state.engine();
    Json(StatsResponse {
        tasks: engine.stats(),
        backend: engine.summarizer().name().to_string(),
        model: engine.summarizer().model().to_string(),
        uptime_secs: state.uptime().as_secs(),
    })
}
