//! Content store providers.

pub mod local;
