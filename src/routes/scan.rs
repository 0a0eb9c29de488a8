//! Scan endpoint
//!
//! `POST /post/` takes a multipart upload with the photo in the `image` field
//! and answers with the title groups found on it.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::pipeline::SessionResult;
use crate::state::AppState;

/// Multipart field carrying the photo
const IMAGE_FIELD: &str = "image";

/// Create the scan router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/post", post(scan))
        .route("/post/", post(scan))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

struct Upload {
    file_name: String,
    data: Vec<u8>,
}

/// POST /post/
async fn scan(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SessionResult>> {
    let upload = read_image_field(&mut multipart).await?;
    check_image(&upload.data)?;

    tracing::info!(
        file_name = %upload.file_name,
        size = upload.data.len(),
        "Scanning uploaded image"
    );

    let result = state
        .pipeline()
        .process(&upload.data, &upload.file_name)
        .await?;

    Ok(Json(result))
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Upload> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        AppError::Intake(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some(IMAGE_FIELD) {
            tracing::debug!(name = ?field.name(), "Skipping multipart field");
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::Intake("The image field needs a file name".to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Intake(format!("Failed to read image data: {}", e)))?;

        return Ok(Upload {
            file_name,
            data: data.to_vec(),
        });
    }

    Err(AppError::Intake(format!(
        "No file provided. Use field name '{}'",
        IMAGE_FIELD
    )))
}

/// Reject empty uploads and anything that does not look like an image
fn check_image(data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(AppError::Intake("Uploaded image is empty".to_string()));
    }
    image::guess_format(data)
        .map(|_| ())
        .map_err(|_| AppError::Intake("Upload is not a recognized image format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::pipeline::TitleCandidate;
    use crate::routes::testing::{test_state, PNG_MAGIC};

    const BOUNDARY: &str = "shelfscan-test-boundary";

    fn multipart_body(field: &str, file_name: Option<&str>, data: &[u8]) -> Vec<u8> {
        let disposition = match file_name {
            Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
            None => format!("form-data; name=\"{}\"", field),
        };
        let mut body = format!(
            "--{}\r\nContent-Disposition: {}\r\nContent-Type: image/png\r\n\r\n",
            BOUNDARY, disposition
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn scan_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/post/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let app = router(1024 * 1024).with_state(state);
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_scan_returns_title_groups() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path(), 2).await;

        let (status, json) = send(
            state,
            scan_request(multipart_body("image", Some("shelf.png"), PNG_MAGIC)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let titles = json["titles"].as_array().unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0]["text"], "Moby Dick");
        let results: Vec<TitleCandidate> =
            serde_json::from_value(titles[0]["results"].clone()).unwrap();
        assert_eq!(
            results,
            vec![TitleCandidate {
                link: "https://example.com/md".to_string(),
                title: "Moby-Dick".to_string(),
            }]
        );
        assert!(titles[0]["img"].as_str().unwrap().ends_with("cropped0.png"));
    }

    #[tokio::test]
    async fn test_scan_without_spines_is_empty_success() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path(), 0).await;

        let (status, json) = send(
            state,
            scan_request(multipart_body("image", Some("shelf.png"), PNG_MAGIC)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "titles": [] }));
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path(), 2).await;

        let (status, json) = send(
            state,
            scan_request(multipart_body("photo", Some("shelf.png"), PNG_MAGIC)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_missing_file_name() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path(), 2).await;

        let (status, _) = send(state, scan_request(multipart_body("image", None, PNG_MAGIC))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsafe_file_name() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path().join("sessions").as_path(), 2).await;

        let (status, _) = send(
            state,
            scan_request(multipart_body("image", Some("../escape.png"), PNG_MAGIC)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!temp_dir.path().join("sessions/escape.png").exists());
        assert!(!temp_dir.path().join("escape.png").exists());
    }

    #[tokio::test]
    async fn test_non_image_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(temp_dir.path(), 2).await;

        let (status, json) = send(
            state,
            scan_request(multipart_body("image", Some("shelf.png"), b"just some text")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("image"));
    }

    #[test]
    fn test_check_image() {
        assert!(check_image(PNG_MAGIC).is_ok());
        assert!(check_image(&[0xFF, 0xD8, 0xFF, 0xE0]).is_ok());
        assert!(matches!(check_image(b""), Err(AppError::Intake(_))));
        assert!(matches!(check_image(b"GIF"), Err(AppError::Intake(_))));
    }
}
