//! Database connection pool module.
//!
//! Provides async PostgreSQL connection pooling using diesel_async with bb8,
//! plus embedded migrations.

mod pool;

pub use pool::{AsyncDbPool, establish_async_connection_pool};

use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::error::{AppError, AppResult};

/// All SQL migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Lists pending migration names without applying them.
pub async fn pending_migrations(database_url: &str) -> AppResult<Vec<String>> {
    let database_url = database_url.to_string();

    tokio::task::spawn_blocking(move || {
        use diesel::Connection;
        use diesel::migration::Migration;
        use diesel::pg::PgConnection;

        let mut conn = PgConnection::establish(&database_url).map_err(|e| AppError::Database {
            operation: "establish connection for migration check".to_string(),
            source: anyhow::anyhow!("Connection error: {}", e),
        })?;

        let pending = conn
            .pending_migrations(MIGRATIONS)
            .map_err(|e| AppError::Database {
                operation: "check pending migrations".to_string(),
                source: anyhow::anyhow!("Migration error: {}", e),
            })?;

        Ok(pending.iter().map(|m| m.name().to_string()).collect())
    })
    .await
    .map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })?
}

/// Applies pending migrations over a blocking connection.
///
/// diesel migrations are synchronous, so this runs on the blocking thread
/// pool with a plain `PgConnection`.
pub async fn run_pending_migrations(database_url: &str) -> AppResult<Vec<String>> {
    let database_url = database_url.to_string();

    tokio::task::spawn_blocking(move || {
        use diesel::Connection;
        use diesel::pg::PgConnection;

        let mut conn = PgConnection::establish(&database_url).map_err(|e| AppError::Database {
            operation: "establish connection for migrations".to_string(),
            source: anyhow::anyhow!("Connection error: {}", e),
        })?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| AppError::Database {
                operation: "run pending migrations".to_string(),
                source: anyhow::anyhow!("Migration error: {}", e),
            })?;

        Ok(applied.iter().map(|m| m.to_string()).collect())
    })
    .await
    .map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })?
}
