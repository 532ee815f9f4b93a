//! # driftbox-storage
//!
//! The concrete [`FileContents`](driftbox_entity::file::FileContents)
//! implementation writing file bytes to the local filesystem.

pub mod providers;

pub use providers::local::LocalContents;
