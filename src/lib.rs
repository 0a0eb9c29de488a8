//! Shelfscan Server Library
//!
//! Identifies books from a photo of their spines. The main server binary is
//! in main.rs; everything it wires together lives here so tests and benches
//! can reach it.
//!
//! # Modules
//!
//! - `config`: Process-wide settings loaded at startup
//! - `session`: Per-scan working directories
//! - `pipeline`: Segmentation, recognition, filtering and title lookup
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod session;
pub mod state;
