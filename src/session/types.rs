//! Session types

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::store::Lease;

/// One processing run's isolated working area
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session ID
    pub id: Uuid,

    /// Directory holding the source image and every derived fragment
    pub dir: PathBuf,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Keeps the ID reserved in the store while the request runs
    pub(crate) _lease: Option<Arc<Lease>>,
}

impl Session {
    /// Session over an existing directory, not tracked by any store
    pub fn detached(id: Uuid, dir: impl Into<PathBuf>) -> Self {
        Self {
            id,
            dir: dir.into(),
            created_at: Utc::now(),
            _lease: None,
        }
    }

    /// Session ID as used in directory names and URLs
    pub fn key(&self) -> String {
        self.id.simple().to_string()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `path` lives directly inside this session's directory
    pub fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
    }
}

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unsafe file name: {0:?}")]
    InvalidFileName(String),

    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),

    #[error("Session file not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check that `name` is a single, plain path component.
///
/// Rejects empty names, separators of either platform, `.`/`..`, and NUL.
pub fn validate_file_name(name: &str) -> Result<(), SessionError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if unsafe_name {
        return Err(SessionError::InvalidFileName(name.to_string()));
    }
    Ok(())
}
