//! SQLite database adapters for the issue tracker.

pub mod connection;
pub mod issue_store;
pub mod migrations;

pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use issue_store::SqliteIssueStore;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};

use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

/// Open the pool, verify it answers, and bring the schema up to date.
pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    verify_connection(&pool).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}
