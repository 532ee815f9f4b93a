//! # driftbox-service
//!
//! Orchestration layer tying the content store and the metadata index
//! together behind a single file API.

pub mod file;

pub use file::{FileService, FileUpload};
