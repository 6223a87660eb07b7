//! Duplicate guard and transaction coordinator for item writes.
//!
//! Every write that can introduce a name runs inside one storage
//! transaction under a per-name lock:
//!
//! 1. `lock_name` takes the exclusive name lock and reads any live row;
//! 2. an existing row aborts the transaction with [`GuardError::AlreadyExists`];
//! 3. otherwise the write happens in the same transaction, then commit.
//!
//! The storage uniqueness constraint backs this up: a unique violation
//! raised at write or commit time is reported as `AlreadyExists` as well,
//! never as a raw storage error. Each transaction is bounded by a deadline
//! so a stuck lock holder cannot block other writers indefinitely.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use itemkit_core::types::DbId;
use thiserror::Error;

use crate::error::StoreError;
use crate::models::item::{Item, NewItem};
use crate::store::{ItemStore, ItemTx};

/// Outcome of a guarded write that did not succeed.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A live item already uses `name`. Expected business outcome.
    #[error("item already exists: {name}")]
    AlreadyExists { name: String },

    /// Any other storage failure, passed through unchanged.
    #[error(transparent)]
    Store(StoreError),
}

/// Map a storage error raised while writing `name`.
fn classify(err: StoreError, name: &str) -> GuardError {
    if err.is_unique_violation() {
        GuardError::AlreadyExists {
            name: name.to_string(),
        }
    } else {
        GuardError::Store(err)
    }
}

/// Commit on success, roll back on failure.
async fn finish<T>(
    tx: Box<dyn ItemTx>,
    result: Result<T, GuardError>,
    name: &str,
) -> Result<T, GuardError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(|e| classify(e, name))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(err)
        }
    }
}

/// Name reported when a whole batch fails at commit, where the colliding
/// row is not known.
fn batch_label(len: usize) -> String {
    format!("batch of {len} items")
}

/// Lock `name` and fail if a live item other than `allowed` holds it.
async fn claim_name(
    tx: &mut dyn ItemTx,
    name: &str,
    allowed: Option<DbId>,
) -> Result<(), GuardError> {
    let existing = tx.lock_name(name).await.map_err(|e| classify(e, name))?;
    match existing {
        Some(item) if Some(item.id) != allowed => Err(GuardError::AlreadyExists {
            name: name.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Coordinates duplicate-safe item writes over an [`ItemStore`].
#[derive(Clone)]
pub struct DuplicateGuard {
    store: Arc<dyn ItemStore>,
    tx_timeout: Duration,
}

impl DuplicateGuard {
    pub fn new(store: Arc<dyn ItemStore>, tx_timeout: Duration) -> Self {
        Self { store, tx_timeout }
    }

    /// Run `fut` under the transaction deadline. On expiry the future is
    /// dropped, which drops its transaction and rolls it back.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, GuardError>>,
    ) -> Result<T, GuardError> {
        match tokio::time::timeout(self.tx_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.tx_timeout.as_millis() as u64,
                    "Item transaction exceeded its deadline, rolled back"
                );
                Err(GuardError::Store(StoreError::Timeout))
            }
        }
    }

    /// Insert `item` unless a live item with the same name exists.
    ///
    /// Of any number of concurrent callers with the same name, exactly one
    /// succeeds; the rest get [`GuardError::AlreadyExists`].
    pub async fn atomic_create(&self, item: &NewItem) -> Result<Item, GuardError> {
        self.bounded(async {
            let mut tx = self.store.begin().await.map_err(GuardError::Store)?;
            let result = async {
                claim_name(&mut *tx, &item.name, None).await?;
                tx.insert(item).await.map_err(|e| classify(e, &item.name))
            }
            .await;
            finish(tx, result, &item.name).await
        })
        .await
        .inspect(|created| tracing::debug!(id = created.id, name = %created.name, "Item inserted"))
        .inspect_err(log_outcome)
    }

    /// Insert every item in input order inside a single transaction.
    ///
    /// All-or-nothing: the first failing insert rolls back the whole batch.
    /// Callers are expected to have run [`DuplicateGuard::ensure_names_free`]
    /// first; overlapping concurrent batches are caught by the storage
    /// constraint and reported as `AlreadyExists`.
    pub async fn atomic_create_all(&self, items: &[NewItem]) -> Result<Vec<Item>, GuardError> {
        let label = batch_label(items.len());
        self.bounded(async {
            let mut tx = self.store.begin().await.map_err(GuardError::Store)?;
            let result = async {
                let mut created = Vec::with_capacity(items.len());
                for item in items {
                    let row = tx.insert(item).await.map_err(|e| classify(e, &item.name))?;
                    created.push(row);
                }
                Ok::<_, GuardError>(created)
            }
            .await;
            finish(tx, result, &label).await
        })
        .await
        .inspect(|created| tracing::debug!(count = created.len(), "Bulk items inserted"))
        .inspect_err(log_outcome)
    }

    /// Overwrite name and amount of item `id`, keeping the name unique.
    ///
    /// The item's own current name is not a conflict. Returns `None` if
    /// the item is not live.
    pub async fn atomic_save(
        &self,
        id: DbId,
        name: &str,
        amount: u32,
    ) -> Result<Option<Item>, GuardError> {
        self.bounded(async {
            let mut tx = self.store.begin().await.map_err(GuardError::Store)?;
            let result = async {
                claim_name(&mut *tx, name, Some(id)).await?;
                tx.save(id, name, amount)
                    .await
                    .map_err(|e| classify(e, name))
            }
            .await;
            finish(tx, result, name).await
        })
        .await
        .inspect_err(log_outcome)
    }

    /// Fail with `AlreadyExists` if any of `names` is used by a live item.
    ///
    /// Issues one query per chunk of at most `batch_size` names.
    pub async fn ensure_names_free(
        &self,
        names: &[String],
        batch_size: usize,
    ) -> Result<(), GuardError> {
        for chunk in names.chunks(batch_size.max(1)) {
            let existing = self
                .store
                .find_by_names(chunk)
                .await
                .map_err(GuardError::Store)?;
            if let Some(found) = existing.into_iter().next() {
                tracing::debug!(name = %found.name, "Bulk candidate name already in use");
                return Err(GuardError::AlreadyExists { name: found.name });
            }
        }
        Ok(())
    }
}

fn log_outcome(err: &GuardError) {
    match err {
        GuardError::AlreadyExists { name } => {
            tracing::debug!(%name, "Item name already taken, transaction rolled back");
        }
        GuardError::Store(store_err) => {
            tracing::error!(error = %store_err, "Item transaction failed, rolled back");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
