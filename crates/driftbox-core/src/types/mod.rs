//! Shared value types used across the Driftbox crates.

pub mod id;
pub mod list;
pub mod path;
