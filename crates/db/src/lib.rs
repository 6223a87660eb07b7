//! Storage access layer for items.
//!
//! The [`store::ItemStore`] trait is the seam between business rules and
//! storage. [`repositories::PgItemStore`] is the production backend;
//! [`memory::MemoryItemStore`] implements the same transactional contract
//! in-process for tests and local runs. [`guard::DuplicateGuard`] owns the
//! lock-then-insert protocol that keeps live item names unique.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod guard;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use error::{StoreError, StoreResult};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
