//! Request handlers

use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use courseta_core::{Answer, CoursetaError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// A student question, optionally with an attached screenshot
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Base64-encoded image; validated, acknowledged, never forwarded
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `CoursetaError` carried across the handler boundary with its HTTP
/// status mapping
pub struct ApiError(CoursetaError);

impl From<CoursetaError> for ApiError {
    fn from(error: CoursetaError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            info!("Request rejected: {}", self.0);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Answer a student question against the current snapshot
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Answer>, ApiError> {
    info!("Answering question ({} chars)", request.question.len());

    let snapshot = state.snapshot().await;
    let answer = state
        .pipeline
        .answer(&request.question, request.image.as_deref(), &snapshot)
        .await?;

    Ok(Json(answer))
}

/// Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Pick up the latest persisted snapshot without a restart
pub async fn reload_snapshot(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.reload_snapshot().await;
    Json(serde_json::json!({
        "discourse_posts": snapshot.discourse.len(),
        "github_files": snapshot.github.len(),
        "fetched_at": snapshot.fetched_at,
    }))
}
