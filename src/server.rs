//! HTTP transport for the subtitle pipeline.

use crate::error::{PipelineError, Result};
use crate::pipeline::Pipeline;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Multipart field carrying the uploaded video.
pub const VIDEO_FIELD: &str = "video";
/// Multipart field carrying the source language hint.
pub const LANGUAGE_FIELD: &str = "language";

/// A pipeline failure rendered as a JSON error body.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = json!({
            "success": false,
            "stage": self.0.stage(),
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(pipeline: Arc<Pipeline>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/process-video", post(process_video))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(pipeline: Arc<Pipeline>, addr: &str, max_upload_bytes: usize) -> Result<()> {
    let app = router(pipeline, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, finishing in-flight requests");
}

async fn home(State(pipeline): State<Arc<Pipeline>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "OK",
        "message": "Bilingual subtitle backend is running",
        "version": env!("CARGO_PKG_VERSION"),
        "models_loaded": pipeline.readiness().is_ready(),
    }))
}

async fn health(State(pipeline): State<Arc<Pipeline>>) -> (StatusCode, Json<serde_json::Value>) {
    let readiness = pipeline.readiness();
    let loaded = |ready: bool| if ready { "loaded" } else { "not_loaded" };

    let (status, label) = if readiness.is_ready() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let body = json!({
        "status": label,
        "services": {
            "transcriber": loaded(readiness.transcriber),
            "translator": loaded(readiness.translator),
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    (status, Json(body))
}

async fn process_video(
    State(pipeline): State<Arc<Pipeline>>,
    mut multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let mut video = None;
    // Left blank when absent so the pipeline applies its configured default.
    let mut language = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::Input(format!("Malformed upload: {}", e)))?
    {
        match field.name() {
            Some(VIDEO_FIELD) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| PipelineError::Input(format!("Failed to read video: {}", e)))?;
                video = Some(bytes);
            }
            Some(LANGUAGE_FIELD) => {
                language = field
                    .text()
                    .await
                    .map_err(|e| PipelineError::Input(format!("Failed to read language: {}", e)))?;
            }
            _ => {}
        }
    }

    let video = video.ok_or_else(|| PipelineError::Input("No video file provided".to_string()))?;

    let result = pipeline.process(&video, &language).await?;
    Ok(Json(result).into_response())
}
