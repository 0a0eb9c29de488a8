//! Session Module
//!
//! Every uploaded photo gets its own session: a fresh directory that holds the
//! source image and every fragment the segmenter cuts from it. Sessions are
//! kept on disk once the request finishes so the front end can display the
//! fragments.

pub mod store;
pub mod types;

pub use store::SessionStore;
pub use types::{validate_file_name, Session, SessionError};
