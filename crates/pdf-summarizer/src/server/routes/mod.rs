//! API routes for the summarizer server

pub mod history;
pub mod tasks;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        // Upload - with larger body limit for PDFs
        .route(
            "/upload",
            post(upload::upload_pdf).layer(DefaultBodyLimit::max(body_limit)),
        )
        // Task polling
        .route("/status/:task_id", get(tasks::get_status))
        .route("/stats", get(tasks::get_stats))
        // Recently completed documents
        .route("/history", get(history::get_history))
}
