//! # driftbox-database
//!
//! Connection pool management, migrations, and the concrete
//! [`FileIndex`](driftbox_entity::file::FileIndex) implementations for
//! PostgreSQL and SQLite.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use repositories::pg::PgFileIndex;
pub use repositories::sqlite::SqliteFileIndex;
