//! In-memory implementation of the item storage traits.
//!
//! Mirrors the PostgreSQL backend closely enough to exercise the duplicate
//! guard without a database:
//!
//! - transactions stage their writes and publish them atomically at commit;
//! - [`ItemTx::lock_name`] takes a per-name async lock held until the
//!   transaction ends;
//! - the live-name uniqueness constraint is checked at insert and again at
//!   commit, so two transactions that skip the lock still cannot both
//!   publish the same name;
//! - ids come from a sequence that is not rolled back, like `BIGSERIAL`.
//!
//! The std mutexes are never held across an await point.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use itemkit_core::types::{DbId, Timestamp};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{StoreError, StoreResult, ITEM_NAME_CONSTRAINT};
use crate::models::item::{Item, NewItem};
use crate::store::{ItemStore, ItemTx};

/// In-memory implementation of [`ItemStore`]. Cloning shares the same data.
#[derive(Debug, Default, Clone)]
pub struct MemoryItemStore {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    table: Mutex<Table>,
    name_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

#[derive(Debug, Default, Clone)]
struct Table {
    last_id: DbId,
    rows: BTreeMap<DbId, Item>,
}

/// A write recorded by a transaction, replayed at commit.
#[derive(Debug, Clone)]
enum Staged {
    Insert(Item),
    Save {
        id: DbId,
        name: String,
        amount: i64,
        at: Timestamp,
    },
    Delete {
        id: DbId,
        at: Timestamp,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn name_taken() -> StoreError {
    StoreError::UniqueViolation {
        constraint: ITEM_NAME_CONSTRAINT.to_string(),
    }
}

impl Table {
    fn live(&self) -> impl Iterator<Item = &Item> {
        self.rows.values().filter(|row| row.is_live())
    }

    fn live_by_id(&self, id: DbId) -> Option<&Item> {
        self.rows.get(&id).filter(|row| row.is_live())
    }

    fn live_by_name(&self, name: &str) -> Option<&Item> {
        self.live().find(|row| row.name == name)
    }

    fn name_used_by_other(&self, name: &str, id: DbId) -> bool {
        self.live().any(|row| row.name == name && row.id != id)
    }

    /// Enforce `uq_items_name_live` for a pending write.
    fn check(&self, op: &Staged) -> StoreResult<()> {
        match op {
            Staged::Insert(item) if self.name_used_by_other(&item.name, item.id) => {
                Err(name_taken())
            }
            Staged::Save { id, name, .. }
                if self.live_by_id(*id).is_some() && self.name_used_by_other(name, *id) =>
            {
                Err(name_taken())
            }
            _ => Ok(()),
        }
    }

    fn overlay(&mut self, op: &Staged) {
        match op {
            Staged::Insert(item) => {
                self.rows.insert(item.id, item.clone());
            }
            Staged::Save {
                id,
                name,
                amount,
                at,
            } => {
                if let Some(row) = self.rows.get_mut(id).filter(|row| row.is_live()) {
                    row.name = name.clone();
                    row.amount = *amount;
                    row.updated_at = *at;
                }
            }
            Staged::Delete { id, at } => {
                if let Some(row) = self.rows.get_mut(id).filter(|row| row.is_live()) {
                    row.deleted_at = Some(*at);
                    row.updated_at = *at;
                }
            }
        }
    }
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `name`. Entries nobody holds or waits on are pruned
    /// here, so the map only tracks names in active use.
    fn name_lock(&self, name: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = lock(&self.shared.name_locks);
        locks.retain(|_, handle| Arc::strong_count(handle) > 1);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    fn next_id(&self) -> DbId {
        let mut table = lock(&self.shared.table);
        table.last_id += 1;
        table.last_id
    }

    fn snapshot(&self) -> Table {
        lock(&self.shared.table).clone()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn begin(&self) -> StoreResult<Box<dyn ItemTx>> {
        Ok(Box::new(MemoryItemTx {
            store: self.clone(),
            staged: Vec::new(),
            held: HashMap::new(),
        }))
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Item>> {
        Ok(lock(&self.shared.table).live_by_id(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Item>> {
        Ok(lock(&self.shared.table).live_by_name(name).cloned())
    }

    async fn find_by_names(&self, names: &[String]) -> StoreResult<Vec<Item>> {
        let table = lock(&self.shared.table);
        Ok(table
            .live()
            .filter(|row| names.contains(&row.name))
            .cloned()
            .collect())
    }

    async fn list_page(&self, offset: i64, limit: i64) -> StoreResult<Vec<Item>> {
        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let table = lock(&self.shared.table);
        Ok(table.live().skip(skip).take(take).cloned().collect())
    }

    async fn count(&self) -> StoreResult<i64> {
        let table = lock(&self.shared.table);
        Ok(table.live().count() as i64)
    }

    async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        let mut table = lock(&self.shared.table);
        if table.live_by_id(id).is_none() {
            return Ok(false);
        }
        table.overlay(&Staged::Delete { id, at: Utc::now() });
        Ok(true)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// An open in-memory transaction. Dropping it discards staged writes and
/// releases its name locks.
pub struct MemoryItemTx {
    store: MemoryItemStore,
    staged: Vec<Staged>,
    held: HashMap<String, OwnedMutexGuard<()>>,
}

impl MemoryItemTx {
    /// Committed rows with this transaction's own writes applied on top.
    fn view(&self) -> Table {
        let mut table = self.store.snapshot();
        for op in &self.staged {
            table.overlay(op);
        }
        table
    }
}

#[async_trait]
impl ItemTx for MemoryItemTx {
    async fn lock_name(&mut self, name: &str) -> StoreResult<Option<Item>> {
        if !self.held.contains_key(name) {
            let guard = self.store.name_lock(name).lock_owned().await;
            self.held.insert(name.to_string(), guard);
        }
        Ok(self.view().live_by_name(name).cloned())
    }

    async fn find_by_id(&mut self, id: DbId) -> StoreResult<Option<Item>> {
        Ok(self.view().live_by_id(id).cloned())
    }

    async fn find_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Item>> {
        Ok(self
            .view()
            .live()
            .filter(|row| names.contains(&row.name))
            .cloned()
            .collect())
    }

    async fn insert(&mut self, item: &NewItem) -> StoreResult<Item> {
        if self.view().live_by_name(&item.name).is_some() {
            return Err(name_taken());
        }
        let now = Utc::now();
        let row = Item {
            id: self.store.next_id(),
            name: item.name.clone(),
            amount: i64::from(item.amount),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.staged.push(Staged::Insert(row.clone()));
        Ok(row)
    }

    async fn save(&mut self, id: DbId, name: &str, amount: u32) -> StoreResult<Option<Item>> {
        let view = self.view();
        let Some(existing) = view.live_by_id(id) else {
            return Ok(None);
        };
        if view.name_used_by_other(name, id) {
            return Err(name_taken());
        }
        let at = Utc::now();
        let updated = Item {
            name: name.to_string(),
            amount: i64::from(amount),
            updated_at: at,
            ..existing.clone()
        };
        self.staged.push(Staged::Save {
            id,
            name: updated.name.clone(),
            amount: updated.amount,
            at,
        });
        Ok(Some(updated))
    }

    async fn soft_delete(&mut self, id: DbId) -> StoreResult<bool> {
        if self.view().live_by_id(id).is_none() {
            return Ok(false);
        }
        self.staged.push(Staged::Delete { id, at: Utc::now() });
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryItemTx {
            store,
            staged,
            held,
        } = *self;

        {
            let mut table = lock(&store.shared.table);
            let mut next = table.clone();
            for op in &staged {
                next.check(op)?;
                next.overlay(op);
            }
            table.rows = next.rows;
        }

        drop(held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
