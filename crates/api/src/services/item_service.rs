//! Item use cases.

use std::sync::Arc;
use std::time::Duration;

use itemkit_core::error::CoreError;
use itemkit_core::item::{
    find_duplicate_name, normalize_name, validate_amount, validate_bulk_size, validate_item,
    validate_name, ALREADY_EXISTS, DUPLICATE_CHECK_BATCH_SIZE, ITEM_ENTITY, NO_UPDATES,
};
use itemkit_core::pagination::{PageRequest, PaginatedResult};
use itemkit_core::types::DbId;
use itemkit_db::guard::{DuplicateGuard, GuardError};
use itemkit_db::models::item::{Item, NewItem, UpdateItem};
use itemkit_db::store::ItemStore;
use itemkit_db::StoreError;

/// Failure of an item use case.
///
/// Domain outcomes (not found, validation, name conflict) are
/// [`CoreError`]s. Storage failures that have no domain meaning pass
/// through unchanged as [`StoreError`].
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ItemError {
    fn from(err: StoreError) -> Self {
        if err.is_unique_violation() {
            ItemError::Core(CoreError::Conflict(ALREADY_EXISTS.to_string()))
        } else {
            ItemError::Store(err)
        }
    }
}

impl From<GuardError> for ItemError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::AlreadyExists { .. } => {
                ItemError::Core(CoreError::Conflict(ALREADY_EXISTS.to_string()))
            }
            GuardError::Store(store_err) => store_err.into(),
        }
    }
}

fn not_found(id: DbId) -> ItemError {
    ItemError::Core(CoreError::NotFound {
        entity: ITEM_ENTITY,
        id,
    })
}

/// Orchestrates item reads and duplicate-safe writes.
pub struct ItemService {
    store: Arc<dyn ItemStore>,
    guard: DuplicateGuard,
}

impl ItemService {
    /// `tx_timeout` bounds every write transaction.
    pub fn new(store: Arc<dyn ItemStore>, tx_timeout: Duration) -> Self {
        let guard = DuplicateGuard::new(Arc::clone(&store), tx_timeout);
        Self { store, guard }
    }

    /// Trim, validate and insert a single item.
    pub async fn create(&self, input: NewItem) -> Result<Item, ItemError> {
        let candidate = NewItem::normalized(&input.name, input.amount);
        validate_item(&candidate.name, candidate.amount)?;

        let item = self.guard.atomic_create(&candidate).await?;
        tracing::info!(item_id = item.id, name = %item.name, "Item created");
        Ok(item)
    }

    /// Create every item or none of them.
    ///
    /// Checks run cheapest first: batch size, duplicates inside the
    /// request, names already stored, then per-item validation. Only then
    /// is a single transaction opened for the inserts.
    pub async fn bulk_create(&self, inputs: Vec<NewItem>) -> Result<Vec<Item>, ItemError> {
        validate_bulk_size(inputs.len())?;

        let candidates: Vec<NewItem> = inputs
            .iter()
            .map(|input| NewItem::normalized(&input.name, input.amount))
            .collect();

        if let Some(name) = find_duplicate_name(candidates.iter().map(|c| c.name.as_str())) {
            tracing::debug!(%name, "Duplicate name inside bulk request");
            return Err(CoreError::Conflict(ALREADY_EXISTS.to_string()).into());
        }

        let names: Vec<String> = candidates.iter().map(|c| c.name.clone()).collect();
        self.guard
            .ensure_names_free(&names, DUPLICATE_CHECK_BATCH_SIZE)
            .await?;

        for candidate in &candidates {
            validate_item(&candidate.name, candidate.amount)?;
        }

        let items = self.guard.atomic_create_all(&candidates).await?;
        tracing::info!(count = items.len(), "Bulk items created");
        Ok(items)
    }

    pub async fn get(&self, id: DbId) -> Result<Item, ItemError> {
        self.store.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    /// One page of live items ordered by id.
    pub async fn list(
        &self,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<PaginatedResult<Item>, ItemError> {
        let request = PageRequest::resolve(page, limit)?;
        let total = self.store.count().await?;
        let items = self
            .store
            .list_page(request.offset(), request.limit)
            .await?;
        Ok(PaginatedResult::new(items, total, request))
    }

    /// Apply a partial update.
    ///
    /// The new name is checked against other live items only; keeping the
    /// current name is never a conflict.
    pub async fn update(&self, id: DbId, input: UpdateItem) -> Result<Item, ItemError> {
        if !input.has_updates() {
            return Err(CoreError::Validation(NO_UPDATES.to_string()).into());
        }

        let new_name = input.name.as_deref().map(normalize_name);
        if let Some(name) = &new_name {
            validate_name(name)?;
        }
        if let Some(amount) = input.amount {
            validate_amount(amount)?;
        }

        let existing = self.get(id).await?;
        let name = new_name.unwrap_or(existing.name);
        let amount = match input.amount {
            Some(amount) => amount,
            None => u32::try_from(existing.amount).map_err(|_| {
                CoreError::Internal(format!(
                    "stored amount {} out of range for item {id}",
                    existing.amount
                ))
            })?,
        };

        let item = self
            .guard
            .atomic_save(id, &name, amount)
            .await?
            .ok_or_else(|| not_found(id))?;
        tracing::info!(item_id = item.id, "Item updated");
        Ok(item)
    }

    /// Soft-delete an item.
    pub async fn delete(&self, id: DbId) -> Result<(), ItemError> {
        self.get(id).await?;

        // The row can vanish between the read and the delete.
        if !self.store.soft_delete(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(item_id = id, "Item deleted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
