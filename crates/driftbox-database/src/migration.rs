//! Database migration runners, one per engine.

use sqlx::{PgPool, SqlitePool};
use tracing::info;

use driftbox_core::error::{AppError, ErrorKind};

/// Run all pending PostgreSQL migrations.
pub async fn run_pg_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Running PostgreSQL migrations...");

    sqlx::migrate!("../../migrations/postgres")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Database migrations completed successfully");
    Ok(())
}

/// Run all pending SQLite migrations.
pub async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    info!("Running SQLite migrations...");

    sqlx::migrate!("../../migrations/sqlite")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Database migrations completed successfully");
    Ok(())
}
