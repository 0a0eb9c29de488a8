//! Spine Segmentation
//!
//! The spine cropper is run inside the session directory with the source image
//! name as its only argument. It writes one `croppedN.png` per detected spine
//! next to the image; those files are the only thing read back from it. The
//! uploaded image shares the directory and is never listed as a fragment, even
//! when its name fits the pattern.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::process::run_tool;
use super::types::{Fragment, SegmentationError};
use crate::session::Session;

/// File name prefix of fragments written by the cropper
pub const FRAGMENT_PREFIX: &str = "cropped";

/// File extension of fragments written by the cropper
pub const FRAGMENT_EXTENSION: &str = "png";

/// Splits a shelf photo into per-spine fragments
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Segment `image` (a file inside `session`'s directory).
    ///
    /// Returns fragments sorted by path; an empty list means no spines were
    /// found.
    async fn segment(
        &self,
        session: &Session,
        image: &Path,
    ) -> Result<Vec<Fragment>, SegmentationError>;
}

/// Segmenter backed by the external spine cropping binary
pub struct SpineCropper {
    bin: PathBuf,
    timeout: Duration,
}

impl SpineCropper {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Segmenter for SpineCropper {
    async fn segment(
        &self,
        session: &Session,
        image: &Path,
    ) -> Result<Vec<Fragment>, SegmentationError> {
        let file_name = image
            .file_name()
            .ok_or_else(|| SegmentationError::InvalidImagePath(image.to_path_buf()))?;

        let mut cmd = Command::new(&self.bin);
        cmd.arg(file_name).current_dir(session.dir());

        let output = run_tool(cmd, self.timeout).await?;

        // Exit status is informational only: whatever fragments exist are used
        if !output.status.success() {
            tracing::warn!(
                session_id = %session.key(),
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Spine cropper exited unsuccessfully"
            );
        }

        let fragments = list_fragments(session.dir(), image).await?;

        tracing::info!(
            session_id = %session.key(),
            fragments = fragments.len(),
            "Segmentation complete"
        );

        Ok(fragments)
    }
}

/// Collect `cropped*.png` files in `dir`, sorted by name, leaving out `source`
pub async fn list_fragments(
    dir: &Path,
    source: &Path,
) -> Result<Vec<Fragment>, SegmentationError> {
    let mut fragments = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if source.file_name() == Some(entry.file_name().as_os_str()) {
            continue;
        }
        let path = entry.path();
        if is_fragment_name(&path) {
            fragments.push(Fragment::new(path));
        }
    }

    fragments.sort();
    Ok(fragments)
}

fn is_fragment_name(path: &Path) -> bool {
    let stem_matches = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(FRAGMENT_PREFIX))
        .unwrap_or(false);
    let ext_matches = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == FRAGMENT_EXTENSION)
        .unwrap_or(false);

    stem_matches && ext_matches
}
