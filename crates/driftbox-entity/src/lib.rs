//! # driftbox-entity
//!
//! Domain entities for Driftbox: the file/folder aggregate, the transient
//! byte-content handle, and the contracts (`FileContents`, `FileIndex`)
//! implemented by the storage and database crates.

pub mod file;
