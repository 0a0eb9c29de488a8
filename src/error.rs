//! Error types for the Shelfscan server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::{PipelineError, SegmentationError};
use crate::session::SessionError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Request-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid upload: {0}")]
    Intake(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Segmentation failed: {0}")]
    Segmentation(#[from] SegmentationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Session(e) => AppError::Session(e),
            PipelineError::Segmentation(e) => AppError::Segmentation(e),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Intake(_) => StatusCode::BAD_REQUEST,
            AppError::Session(SessionError::InvalidFileName(_))
            | AppError::Session(SessionError::InvalidSessionId(_)) => StatusCode::BAD_REQUEST,
            AppError::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Session(SessionError::Io(_))
            | AppError::Segmentation(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Intake(_) => "bad_request",
            AppError::Session(SessionError::InvalidFileName(_))
            | AppError::Session(SessionError::InvalidSessionId(_)) => "bad_request",
            AppError::Session(SessionError::NotFound(_)) => "not_found",
            AppError::Session(SessionError::Io(_)) => "storage_error",
            AppError::Segmentation(_) => "segmentation_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!("{}", self);
            match &self {
                AppError::Segmentation(_) => "Failed to segment the image".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: self.kind().to_string(),
            message,
        });

        (status, body).into_response()
    }
}
