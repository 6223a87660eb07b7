//! PostgreSQL repository for the `items` table.

use std::time::Duration;

use async_trait::async_trait;
use itemkit_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::StoreResult;
use crate::models::item::{Item, NewItem};
use crate::store::{ItemStore, ItemTx};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, amount, created_at, updated_at, deleted_at";

/// Provides CRUD operations for items backed by PostgreSQL.
#[derive(Clone)]
pub struct PgItemStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgItemStore {
    /// `lock_timeout` bounds how long a transaction waits on a row or name
    /// lock before PostgreSQL aborts the statement.
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn begin(&self) -> StoreResult<Box<dyn ItemTx>> {
        let mut tx = self.pool.begin().await?;

        // SET does not accept bind parameters; the value is an integer we own.
        let set_timeout = format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        );
        sqlx::query(&set_timeout).execute(&mut *tx).await?;

        Ok(Box::new(PgItemTx { tx }))
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Item>> {
        let query = format!("SELECT {COLUMNS} FROM items WHERE id = $1 AND deleted_at IS NULL");
        let item = sqlx::query_as::<_, Item>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Item>> {
        let query =
            format!("SELECT {COLUMNS} FROM items WHERE name = $1 AND deleted_at IS NULL");
        let item = sqlx::query_as::<_, Item>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn find_by_names(&self, names: &[String]) -> StoreResult<Vec<Item>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM items \
             WHERE name = ANY($1) AND deleted_at IS NULL \
             ORDER BY id"
        );
        let items = sqlx::query_as::<_, Item>(&query)
            .bind(names)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn list_page(&self, offset: i64, limit: i64) -> StoreResult<Vec<Item>> {
        let query = format!(
            "SELECT {COLUMNS} FROM items \
             WHERE deleted_at IS NULL \
             ORDER BY id \
             LIMIT $1 OFFSET $2"
        );
        let items = sqlx::query_as::<_, Item>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn count(&self) -> StoreResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE items SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

/// An open PostgreSQL transaction. Rolled back on drop unless committed.
pub struct PgItemTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ItemTx for PgItemTx {
    async fn lock_name(&mut self, name: &str) -> StoreResult<Option<Item>> {
        // FOR UPDATE only locks rows that exist. The advisory lock covers the
        // case where the name is still free, so concurrent creators of the
        // same name queue here instead of racing to the insert.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(name)
            .execute(&mut *self.tx)
            .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM items \
             WHERE name = $1 AND deleted_at IS NULL \
             FOR UPDATE"
        );
        let item = sqlx::query_as::<_, Item>(&query)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(item)
    }

    async fn find_by_id(&mut self, id: DbId) -> StoreResult<Option<Item>> {
        let query = format!("SELECT {COLUMNS} FROM items WHERE id = $1 AND deleted_at IS NULL");
        let item = sqlx::query_as::<_, Item>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(item)
    }

    async fn find_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Item>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM items \
             WHERE name = ANY($1) AND deleted_at IS NULL \
             ORDER BY id"
        );
        let items = sqlx::query_as::<_, Item>(&query)
            .bind(names)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(items)
    }

    async fn insert(&mut self, item: &NewItem) -> StoreResult<Item> {
        let query = format!(
            "INSERT INTO items (name, amount) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, Item>(&query)
            .bind(&item.name)
            .bind(i64::from(item.amount))
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(created)
    }

    async fn save(&mut self, id: DbId, name: &str, amount: u32) -> StoreResult<Option<Item>> {
        let query = format!(
            "UPDATE items SET \
                name = $2, \
                amount = $3, \
                updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        let item = sqlx::query_as::<_, Item>(&query)
            .bind(id)
            .bind(name)
            .bind(i64::from(amount))
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(item)
    }

    async fn soft_delete(&mut self, id: DbId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE items SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgItemTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let PgItemTx { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
