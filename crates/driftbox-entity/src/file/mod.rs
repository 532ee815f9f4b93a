//! The file/folder aggregate and its collaborating contracts.

mod content;
mod model;
mod store;

pub use content::*;
pub use model::*;
pub use store::*;
