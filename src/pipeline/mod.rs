//! Scan Pipeline Module
//!
//! Turns a photo of book spines into title candidates using three external
//! collaborators:
//! - a spine cropper binary that cuts the photo into per-spine fragments
//! - Tesseract, which reads the text printed on each fragment
//! - Google Custom Search, which maps that text to book titles
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelfscan_server::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::from_config(&config, sessions)?;
//! let result = pipeline.process(&image_bytes, "shelf.jpg").await?;
//! for group in result.titles {
//!     println!("{} -> {} candidates", group.text, group.results.len());
//! }
//! ```

pub mod filter;
pub mod lookup;
pub mod orchestrator;
pub(crate) mod process;
pub mod recognize;
pub mod segment;
pub mod types;

pub use filter::TextFilter;
pub use lookup::{CustomSearchClient, TitleSearch};
pub use orchestrator::Pipeline;
pub use recognize::{Recognizer, TesseractRecognizer};
pub use segment::{Segmenter, SpineCropper};
pub use types::{
    Fragment, LookupError, PipelineError, RecognitionError, SegmentationError, SessionResult,
    TitleCandidate, TitleGroup, ToolError,
};
