//! Pipeline Types
//!
//! Data passed between the scan stages and the error types each stage raises.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SessionError;

/// One cropped spine image produced by the segmenter
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fragment {
    path: PathBuf,
}

impl Fragment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path string reported to clients, stable for the session's lifetime
    pub fn reference(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// A search hit for a spine's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleCandidate {
    pub link: String,
    pub title: String,
}

/// Result for one fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleGroup {
    /// Fragment path
    pub img: String,
    /// Candidates in the search service's ranking order; empty if nothing matched
    pub results: Vec<TitleCandidate>,
    /// Filtered text that was searched for
    pub text: String,
}

/// Response for one uploaded photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub titles: Vec<TitleGroup>,
}

// ============================================================================
// Errors
// ============================================================================

/// Failure of an external tool run
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("failed to collect output of {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Segmentation failures; these abort the whole request
#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error("Segmentation tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Failed to list fragments: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid source image path: {0}")]
    InvalidImagePath(PathBuf),
}

/// Recognition failures; the affected fragment is skipped
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("Recognition tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Lookup failures; the affected fragment keeps its text with no results
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Search request failed: {0}")]
    Network(String),

    #[error("Search request timed out")]
    TimedOut,

    #[error("Search service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed search response: {0}")]
    MalformedJson(String),

    #[error("Search response is missing {0}")]
    MissingField(&'static str),
}

impl LookupError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::TimedOut)
    }
}

/// Errors that fail a whole scan request
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Segmentation(#[from] SegmentationError),
}
