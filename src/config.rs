//! Configuration management for Shelfscan Server
//!
//! Everything is read once at startup from the environment (after `.env` has
//! been merged by `dotenvy`) and never mutated afterwards.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Default Custom Search endpoint
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Error raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Segmentation binary not found at {0}")]
    SegmenterNotFound(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub search: SearchConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of static front-end assets, served at `/`
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Spine cropper executable
    pub segmenter_bin: PathBuf,
    /// Tesseract executable
    pub recognizer_bin: PathBuf,
    /// Root directory holding one sub-directory per session
    pub sessions_dir: PathBuf,
    /// Upper bound on any single external tool run
    pub tool_timeout: Duration,
    /// Number of fragments processed at once within a request
    pub max_concurrent_fragments: usize,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Custom search engine identifier (`cx`)
    pub engine_id: String,
    pub max_results: usize,
    pub timeout: Duration,
    /// Extra attempts after a transient network failure
    pub retries: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Substrings stripped from recognized text before lookup
    pub denylist: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let engine_id = required("GOOGLE_CUSTOM_SEARCH_ID")?;
        // Accept identifiers pasted in their URL-encoded form ("...%3A...")
        let engine_id = urlencoding::decode(&engine_id)
            .map(|decoded| decoded.into_owned())
            .map_err(|_| ConfigError::Invalid {
                key: "GOOGLE_CUSTOM_SEARCH_ID",
                value: engine_id.clone(),
            })?;

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "SERVER_PORT", 5000)?,
                static_dir: lookup("STATIC_DIR").map(PathBuf::from),
            },
            pipeline: PipelineConfig {
                segmenter_bin: PathBuf::from(required("SPINE_CROP_BIN")?),
                recognizer_bin: PathBuf::from(required("TESSERACT_BIN")?),
                sessions_dir: lookup("SESSIONS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("sessions")),
                tool_timeout: Duration::from_secs(parse_or(&lookup, "TOOL_TIMEOUT_SECS", 60)?),
                max_concurrent_fragments: parse_or(&lookup, "MAX_CONCURRENT_FRAGMENTS", 4usize)?
                    .max(1),
                max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            },
            search: SearchConfig {
                endpoint: lookup("SEARCH_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_SEARCH_ENDPOINT.to_string()),
                api_key: required("GOOGLE_API_KEY")?,
                engine_id,
                max_results: parse_or(&lookup, "SEARCH_MAX_RESULTS", 3)?,
                timeout: Duration::from_secs(parse_or(&lookup, "SEARCH_TIMEOUT_SECS", 8)?),
                retries: parse_or(&lookup, "SEARCH_RETRIES", 1)?,
            },
            filter: FilterConfig {
                denylist: lookup("TEXT_DENYLIST")
                    .map(|raw| {
                        raw.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }

    /// Check settings that depend on the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pipeline.segmenter_bin.exists() {
            return Err(ConfigError::SegmenterNotFound(
                self.pipeline.segmenter_bin.clone(),
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
