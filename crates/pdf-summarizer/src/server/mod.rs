//! HTTP server for the summarizer

pub mod routes;
pub mod state;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{ServerConfig, SummarizerConfig};
use crate::error::{Error, Result};
use crate::types::HealthResponse;
use state::AppState;

/// Summarizer HTTP server
pub struct SummarizerServer {
    config: SummarizerConfig,
    state: AppState,
}

impl SummarizerServer {
    /// Create a new server with the configured backends
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Start the server and run until Ctrl-C or SIGTERM
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let sweeper = self.state.engine().spawn_retention_sweeper();
        let router = build_router(self.state.clone());

        tracing::info!("Starting PDF summarizer on http://{}", addr);
        tracing::info!("API available at http://{}/api/v1", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        sweeper.abort();
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let config = state.config();
    let cors = cors_layer(&config.server);
    let body_limit = config.upload.body_limit();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .nest("/api/v1", routes::api_routes(body_limit))
        .with_state(state)
        // Middleware layers (order matters - applied bottom to top)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Service info endpoint
async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let summarizer = state.engine().summarizer();
    Json(serde_json::json!({
        "name": "pdf-summarizer",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Upload PDFs and poll for AI-generated summaries",
        "backend": summarizer.name(),
        "model": summarizer.model(),
        "endpoints": {
            "POST /api/v1/upload": "Upload a PDF (multipart field 'file')",
            "GET /api/v1/status/:task_id": "Poll task status and progress",
            "GET /api/v1/history": "Recently processed documents",
            "GET /api/v1/stats": "Task statistics"
        }
    }))
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{DocumentProcessor, SummarizationClient};
    use crate::test_support::{multipart_request, StubProcessor, StubSummarizer};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(config: SummarizerConfig, summarizer: StubSummarizer) -> AppState {
        let processor: Arc<dyn DocumentProcessor> = Arc::new(StubProcessor::pages(2));
        let summarizer: Arc<dyn SummarizationClient> = Arc::new(summarizer);
        AppState::with_collaborators(config, processor, summarizer)
    }

    fn test_router() -> (Router, AppState) {
        let state = test_state(SummarizerConfig::default(), StubSummarizer::default());
        (build_router(state.clone()), state)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (router, _) = test_router();
        let (status, body) = send(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reflects_backend_health() {
        let (router, _) = test_router();
        let (status, _) = send(&router, get("/ready")).await;
        assert_eq!(status, StatusCode::OK);

        let state = test_state(SummarizerConfig::default(), StubSummarizer::unhealthy());
        let (status, _) = send(&build_router(state), get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_upload_then_poll_until_completed() {
        let (router, state) = test_router();

        let request = multipart_request(
            "/api/v1/upload",
            "report.pdf",
            "application/pdf",
            b"%PDF-1.7\nbody",
        );
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "processing");
        let task_id = body["task_id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/status/{}", task_id);
        let mut last_progress = 0;
        let body = loop {
            let (status, body) = send(&router, get(&uri)).await;
            assert_eq!(status, StatusCode::OK);
            let progress = body["progress"].as_u64().unwrap();
            assert!(progress >= last_progress);
            last_progress = progress;
            if body["status"] != "processing" {
                break body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };

        assert_eq!(body["status"], "completed");
        assert_eq!(body["progress"], 100);
        assert_eq!(body["result"]["page_count"], 2);
        assert_eq!(body["result"]["filename"], "report.pdf");
        assert!(body["error"].is_null());

        let (status, history) = send(&router, get("/api/v1/history")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["total"], 1);
        assert_eq!(history["documents"][0]["task_id"], task_id.as_str());

        let (_, stats) = send(&router, get("/api/v1/stats")).await;
        assert_eq!(stats["completed"], 1);
        assert_eq!(stats["history_capacity"], 5);
        assert_eq!(stats["backend"], "stub");
        assert!(stats["uptime_secs"].is_u64());
        assert!(state.started_at() <= Utc::now());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_not_found() {
        let (router, _) = test_router();

        for uri in [
            format!("/api/v1/status/{}", uuid::Uuid::new_v4()),
            "/api/v1/status/not-a-task".to_string(),
            "/api/v1/status/12345".to_string(),
        ] {
            let (status, body) = send(&router, get(&uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"]["type"], "not_found");
        }
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_upload() {
        let (router, state) = test_router();

        let request = multipart_request("/api/v1/upload", "notes.txt", "text/plain", b"hello");
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "unsupported_type");
        assert_eq!(state.engine().stats().total_tasks, 0);
    }

    #[tokio::test]
    async fn test_rejects_oversized_upload() {
        let mut config = SummarizerConfig::default();
        config.upload.max_file_size = 32;
        let state = test_state(config, StubSummarizer::default());
        let router = build_router(state.clone());

        let mut data = b"%PDF-1.7\n".to_vec();
        data.extend_from_slice(&[b'x'; 128]);
        let request = multipart_request("/api/v1/upload", "big.pdf", "application/pdf", &data);

        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["type"], "file_too_large");
        assert_eq!(state.engine().stats().total_tasks, 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let (router, _) = test_router();
        let boundary = "test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "validation_error");
    }
}
