//! File upload, download, move, and delete orchestration.

mod service;

pub use service::*;
