use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::backend_client::TransportError;
use crate::filtering::error::OrchestratorError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Orchestrator(e) => {
                let (status, code) = match e {
                    OrchestratorError::NoApplications(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "NO_APPLICATIONS")
                    }
                    OrchestratorError::NoTopCandidates(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "NO_TOP_CANDIDATES")
                    }
                    OrchestratorError::AlreadyRunning(_) => (StatusCode::CONFLICT, "ALREADY_RUNNING"),
                    OrchestratorError::TriggerInFlight(_) => {
                        (StatusCode::CONFLICT, "TRIGGER_IN_FLIGHT")
                    }
                    OrchestratorError::Rejected(_) => (StatusCode::BAD_GATEWAY, "BACKEND_REJECTED"),
                    OrchestratorError::Transport(TransportError::Timeout(_)) => {
                        (StatusCode::GATEWAY_TIMEOUT, "BACKEND_TIMEOUT")
                    }
                    OrchestratorError::Transport(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
                };
                (status, code, e.user_message())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!("Backend error: {self}");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
