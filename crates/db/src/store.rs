//! Storage traits for items.
//!
//! [`ItemStore`] covers reads and single-statement writes that need no
//! coordination. Anything that must be atomic goes through an [`ItemTx`]
//! obtained from [`ItemStore::begin`]. Dropping an `ItemTx` without calling
//! [`ItemTx::commit`] rolls it back.

use async_trait::async_trait;
use itemkit_core::types::DbId;

use crate::error::StoreResult;
use crate::models::item::{Item, NewItem};

/// Abstract storage interface for items.
///
/// Only live (not soft-deleted) rows are visible through these methods.
/// Implementations must be thread-safe and enforce uniqueness of live item
/// names, reporting violations as `StoreError::UniqueViolation`.
#[async_trait]
pub trait ItemStore: Send + Sync + 'static {
    /// Open a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn ItemTx>>;

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Item>>;

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Item>>;

    /// Live items whose name is in `names`. One query regardless of length.
    async fn find_by_names(&self, names: &[String]) -> StoreResult<Vec<Item>>;

    /// Live items ordered by id ascending.
    async fn list_page(&self, offset: i64, limit: i64) -> StoreResult<Vec<Item>>;

    /// Number of live items.
    async fn count(&self) -> StoreResult<i64>;

    /// Soft-delete an item. Returns `true` if a live row was marked deleted.
    async fn soft_delete(&self, id: DbId) -> StoreResult<bool>;

    /// Confirm the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

/// A storage transaction over the `items` table.
#[async_trait]
pub trait ItemTx: Send {
    /// Locking read of the live item named `name`.
    ///
    /// Takes an exclusive, transaction-scoped lock on the name that is held
    /// until commit or rollback, whether or not a row exists. Another
    /// transaction calling `lock_name` with the same name waits.
    async fn lock_name(&mut self, name: &str) -> StoreResult<Option<Item>>;

    async fn find_by_id(&mut self, id: DbId) -> StoreResult<Option<Item>>;

    /// Live items named in `names`, including this transaction's own writes.
    async fn find_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Item>>;

    async fn insert(&mut self, item: &NewItem) -> StoreResult<Item>;

    /// Overwrite name and amount of a live item, bumping `updated_at`.
    ///
    /// Returns `None` if no live row with `id` exists.
    async fn save(&mut self, id: DbId, name: &str, amount: u32) -> StoreResult<Option<Item>>;

    /// Soft-delete inside the transaction; the name is free for later
    /// writes in the same transaction and for others after commit.
    async fn soft_delete(&mut self, id: DbId) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
