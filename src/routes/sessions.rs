//! Session file serving
//!
//! Serves the source photo and fragments of earlier scans so the front end can
//! show which spine each title group came from.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the sessions router
pub fn router() -> Router<AppState> {
    Router::new().route("/:session_id/:file", get(serve_session_file))
}

/// GET /sessions/:session_id/:file
async fn serve_session_file(
    State(state): State<AppState>,
    Path((session_id, file)): Path<(String, String)>,
) -> Result<Response> {
    let path = state.sessions().resolve(&session_id, &file).await?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::Session(e.into()))?;

    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}
