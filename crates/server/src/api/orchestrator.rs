//! Orchestrator API handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use newsbot_core::{OrchestratorStatus, PipelineError, RunReport};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct OrchestratorErrorResponse {
    pub error: String,
    /// Report of the failed run, when one was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunReport>,
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl OrchestratorErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            run: None,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Get orchestrator status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<OrchestratorStatus> {
    Json(state.orchestrator().status().await)
}

/// Start the scheduler
pub async fn start(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.orchestrator().start().await;
    Json(MessageResponse {
        message: "Orchestrator started".to_string(),
    })
}

/// Stop the scheduler, cancelling any run in progress
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.orchestrator().stop().await;
    Json(MessageResponse {
        message: "Orchestrator stopped".to_string(),
    })
}

/// Trigger a single pipeline run and wait for its report.
///
/// The run executes on its own task so a dropped client connection does not
/// abort it halfway through.
pub async fn trigger_run(State(state): State<Arc<AppState>>) -> Response {
    let orchestrator = state.orchestrator().clone();
    let handle = tokio::spawn(async move { orchestrator.run_once().await });

    match handle.await {
        Ok(Ok(report)) => {
            info!(run_id = %report.run_id, "Manual run completed");
            (StatusCode::OK, Json(report)).into_response()
        }
        Ok(Err(PipelineError::AlreadyRunning)) => (
            StatusCode::CONFLICT,
            Json(OrchestratorErrorResponse::new(
                PipelineError::AlreadyRunning.to_string(),
            )),
        )
            .into_response(),
        Ok(Err(e)) => {
            let run = state.orchestrator().last_run().await;
            (
                StatusCode::BAD_GATEWAY,
                Json(OrchestratorErrorResponse {
                    error: e.to_string(),
                    run,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Manual run task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OrchestratorErrorResponse::new("Run task failed")),
            )
                .into_response()
        }
    }
}

/// Report of the most recent finished run
pub async fn last_run(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator().last_run().await {
        Some(report) => Json(report).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(OrchestratorErrorResponse::new("No run has finished yet")),
        )
            .into_response(),
    }
}
