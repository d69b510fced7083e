use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gcode::emitter::EmissionError;
use crate::models::settings::SettingsError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid settings: {}", .0.join("; "))]
    InvalidSettings(Vec<String>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Emission(#[from] EmissionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        AppError::InvalidSettings(err.messages)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidSettings(messages) => {
                tracing::warn!(errors = messages.len(), "Rejected document settings");
                let body = Json(json!({
                    "error": {
                        "code": "INVALID_SETTINGS",
                        "message": "Document settings are invalid",
                        "details": messages,
                    }
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Emission(EmissionError::Cancelled) => (
                StatusCode::CONFLICT,
                "EMISSION_CANCELLED",
                EmissionError::Cancelled.to_string(),
            ),
            AppError::Emission(EmissionError::Failed(msg)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMISSION_FAILED",
                msg.clone(),
            ),
            AppError::Emission(e @ EmissionError::WorkerPanicked(_)) => {
                tracing::error!("Emission worker error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
