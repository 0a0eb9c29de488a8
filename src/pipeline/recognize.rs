//! Spine Text Recognition
//!
//! Runs Tesseract on a single fragment and returns whatever text it printed.
//! The exit status is only logged; a fragment Tesseract complains about may
//! still have printed usable text.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::process::run_tool;
use super::types::{Fragment, RecognitionError};

/// Reads the printed text off a fragment
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Raw recognized text, lines joined with single spaces; may be empty
    async fn recognize(&self, fragment: &Fragment) -> Result<String, RecognitionError>;
}

/// Recognizer backed by the Tesseract CLI (`tesseract <image> stdout`)
pub struct TesseractRecognizer {
    bin: PathBuf,
    timeout: Duration,
}

impl TesseractRecognizer {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Recognizer for TesseractRecognizer {
    async fn recognize(&self, fragment: &Fragment) -> Result<String, RecognitionError> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg(fragment.path()).arg("stdout");

        let output = run_tool(cmd, self.timeout).await?;

        if !output.status.success() {
            tracing::warn!(
                fragment = %fragment.path().display(),
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Tesseract exited unsuccessfully"
            );
        }

        Ok(decode_output(&output.stdout))
    }
}

/// Decode tool output leniently and join its lines with single spaces.
///
/// Invalid UTF-8 sequences are dropped rather than replaced.
pub fn decode_output(stdout: &[u8]) -> String {
    let text: String = String::from_utf8_lossy(stdout)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect();

    text.lines().collect::<Vec<_>>().join(" ")
}
