//! Error types for Skybridge
//!
//! This module defines custom error types used throughout the application.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid model name")]
    InvalidModel,

    #[error("Unexpected upstream response: {0}")]
    UpstreamFormat(String),

    #[error("Image job {job_id} failed")]
    JobFailed { job_id: String },

    #[error("Image job still pending after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response envelope: `{ "code": <status>, "data": { "msg": ... } }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub data: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub msg: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Transport(_) => (
                StatusCode::BAD_GATEWAY,
                "Upstream request failed".to_string(),
            ),
            AppError::Session(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Failed to get session token: {}", msg),
            ),
            // Fixed message the upstream's own web client shows for a bad model.
            AppError::InvalidModel => (StatusCode::INTERNAL_SERVER_ERROR, "Error Model.".to_string()),
            AppError::UpstreamFormat(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::JobFailed { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::PollTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            data: ErrorBody { msg: message },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
