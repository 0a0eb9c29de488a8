//! Route modules for Shelfscan Server

pub mod health;
pub mod scan;
pub mod sessions;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let config = state.config();
    let mut router = Router::new()
        .nest("/health", health::router())
        .nest("/sessions", sessions::router())
        .merge(scan::router(config.pipeline.max_upload_bytes));

    // Front-end assets, including index.html at `/`
    if let Some(static_dir) = &config.server.static_dir {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fake pipeline stages for route tests

    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::config::Config;
    use crate::pipeline::segment::list_fragments;
    use crate::pipeline::{
        Fragment, LookupError, Pipeline, RecognitionError, Recognizer, SegmentationError,
        Segmenter, TextFilter, TitleCandidate, TitleSearch,
    };
    use crate::session::{Session, SessionStore};
    use crate::state::AppState;

    /// Smallest prefix recognized as a PNG
    pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    /// Writes `count` fragments named `cropped0.png`, `cropped1.png`, ...
    struct FakeCropper {
        count: usize,
    }

    #[async_trait]
    impl Segmenter for FakeCropper {
        async fn segment(
            &self,
            session: &Session,
            image: &Path,
        ) -> Result<Vec<Fragment>, SegmentationError> {
            for i in 0..self.count {
                tokio::fs::write(session.dir().join(format!("cropped{}.png", i)), b"png").await?;
            }
            list_fragments(session.dir(), image).await
        }
    }

    /// The first fragment reads "Moby Dick", every other one is blank
    struct FakeTesseract;

    #[async_trait]
    impl Recognizer for FakeTesseract {
        async fn recognize(&self, fragment: &Fragment) -> Result<String, RecognitionError> {
            if fragment.path().ends_with("cropped0.png") {
                Ok("Moby Dick".to_string())
            } else {
                Ok(String::new())
            }
        }
    }

    struct FakeSearch;

    #[async_trait]
    impl TitleSearch for FakeSearch {
        async fn search(
            &self,
            query: &str,
            _max_results: usize,
        ) -> Result<Vec<TitleCandidate>, LookupError> {
            match query {
                "Moby Dick" => Ok(vec![TitleCandidate {
                    link: "https://example.com/md".to_string(),
                    title: "Moby-Dick".to_string(),
                }]),
                _ => Ok(Vec::new()),
            }
        }
    }

    pub fn test_config(sessions_dir: &Path) -> Config {
        let sessions_dir = sessions_dir.display().to_string();
        Config::from_lookup(|key| match key {
            "SPINE_CROP_BIN" => Some("/opt/spinecrop".to_string()),
            "TESSERACT_BIN" => Some("/usr/bin/tesseract".to_string()),
            "GOOGLE_API_KEY" => Some("test-key".to_string()),
            "GOOGLE_CUSTOM_SEARCH_ID" => Some("test-engine".to_string()),
            "SESSIONS_DIR" => Some(sessions_dir.clone()),
            _ => None,
        })
        .unwrap()
    }

    /// App state whose segmenter yields `fragments` spines
    pub async fn test_state(sessions_dir: &Path, fragments: usize) -> AppState {
        let config = test_config(sessions_dir);
        let sessions = SessionStore::open(&config.pipeline.sessions_dir).await.unwrap();
        let pipeline = Pipeline::new(
            sessions,
            Arc::new(FakeCropper { count: fragments }),
            Arc::new(FakeTesseract),
            Arc::new(FakeSearch),
            TextFilter::from_config(&config.filter),
        );
        AppState::new(config, pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use tempfile::TempDir;

    use testing::{test_config, test_state};

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().unwrap();
        let server = TestServer::new(app(test_state(temp_dir.path(), 0).await)).unwrap();

        let response = server.get("/health").await;

        response.assert_status_ok();
        let json = response.json::<serde_json::Value>();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_static_assets_served_at_root() {
        let temp_dir = TempDir::new().unwrap();
        let assets = TempDir::new().unwrap();
        std::fs::write(assets.path().join("index.html"), "<h1>Shelfscan</h1>").unwrap();
        std::fs::write(assets.path().join("index.js"), "\"use strict\";").unwrap();

        let mut config = test_config(temp_dir.path());
        config.server.static_dir = Some(assets.path().to_path_buf());
        let base = test_state(temp_dir.path(), 0).await;
        let state = AppState::new(config, base.pipeline().clone());
        let server = TestServer::new(app(state)).unwrap();

        let index = server.get("/").await;
        index.assert_status_ok();
        index.assert_text("<h1>Shelfscan</h1>");

        let script = server.get("/index.js").await;
        script.assert_status_ok();
        script.assert_text("\"use strict\";");
    }

    #[tokio::test]
    async fn test_no_static_dir_means_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let server = TestServer::new(app(test_state(temp_dir.path(), 0).await)).unwrap();

        let response = server.get("/index.js").expect_failure().await;

        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}
