//! # driftbox-core
//!
//! Core crate for Driftbox. Contains configuration schemas, typed
//! identifiers, the path model, pagination/cursor types, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Driftbox crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
