//! PostgreSQL integration tests for `PgItemStore` and `DuplicateGuard`.
//!
//! Need a live server: run with `DATABASE_URL=... cargo test -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::future::join_all;
use itemkit_db::guard::{DuplicateGuard, GuardError};
use itemkit_db::models::item::NewItem;
use itemkit_db::repositories::PgItemStore;
use itemkit_db::store::ItemStore;
use itemkit_db::StoreError;
use sqlx::PgPool;

fn store_over(pool: PgPool) -> PgItemStore {
    PgItemStore::new(pool, Duration::from_secs(2))
}

fn guard_over(store: &PgItemStore) -> DuplicateGuard {
    DuplicateGuard::new(Arc::new(store.clone()), Duration::from_secs(5))
}

fn new_item(name: &str, amount: u32) -> NewItem {
    NewItem {
        name: name.to_string(),
        amount,
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_bootstrap_health_check(pool: PgPool) {
    itemkit_db::health_check(&pool).await.unwrap();
    store_over(pool).ping().await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_unique_index_maps_to_unique_violation(pool: PgPool) {
    sqlx::query("INSERT INTO items (name, amount) VALUES ('dup', 1)")
        .execute(&pool)
        .await
        .unwrap();

    let err: StoreError = sqlx::query("INSERT INTO items (name, amount) VALUES ('dup', 2)")
        .execute(&pool)
        .await
        .unwrap_err()
        .into();

    assert_matches!(
        err,
        StoreError::UniqueViolation { constraint } if constraint == "uq_items_name_live"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_amount_check_constraint(pool: PgPool) {
    let err: StoreError = sqlx::query("INSERT INTO items (name, amount) VALUES ('big', 1000000)")
        .execute(&pool)
        .await
        .unwrap_err()
        .into();

    assert_matches!(err, StoreError::CheckViolation { .. });
}

// ---------------------------------------------------------------------------
// Reads and soft delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_soft_delete_hides_row_and_frees_name(pool: PgPool) {
    let store = store_over(pool);
    let guard = guard_over(&store);

    let item = guard.atomic_create(&new_item("reuse", 1)).await.unwrap();
    assert!(store.soft_delete(item.id).await.unwrap());
    assert!(!store.soft_delete(item.id).await.unwrap());
    assert!(store.find_by_id(item.id).await.unwrap().is_none());
    assert_eq!(store.count().await.unwrap(), 0);

    let again = guard.atomic_create(&new_item("reuse", 2)).await.unwrap();
    assert_ne!(again.id, item.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_transaction_reads_and_deletes_see_own_writes(pool: PgPool) {
    let store = store_over(pool);
    let names = ["A".to_string(), "B".to_string()];

    let mut tx = store.begin().await.unwrap();
    let a = tx.insert(&new_item("A", 1)).await.unwrap();
    tx.insert(&new_item("B", 2)).await.unwrap();
    assert_eq!(tx.find_by_names(&names).await.unwrap().len(), 2);
    assert!(store.find_by_names(&names).await.unwrap().is_empty());

    assert!(tx.soft_delete(a.id).await.unwrap());
    assert!(!tx.soft_delete(a.id).await.unwrap());
    tx.insert(&new_item("A", 3)).await.unwrap();
    tx.commit().await.unwrap();

    let live = store.find_by_names(&names).await.unwrap();
    let amounts: Vec<i64> = live.iter().map(|item| item.amount).collect();
    assert_eq!(amounts, vec![2, 3]);

    let mut tx = store.begin().await.unwrap();
    assert!(tx.soft_delete(live[0].id).await.unwrap());
    tx.rollback().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_list_page_orders_by_id(pool: PgPool) {
    let store = store_over(pool);
    let guard = guard_over(&store);
    let batch: Vec<_> = (0..25).map(|i| new_item(&format!("p{i:02}"), i)).collect();
    guard.atomic_create_all(&batch).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 25);
    let page3 = store.list_page(20, 10).await.unwrap();
    assert_eq!(page3.len(), 5);
    assert_eq!(page3[0].name, "p20");
    assert!(page3.windows(2).all(|w| w[0].id < w[1].id));

    let found = store
        .find_by_names(&["p03".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(store.find_by_name("p03").await.unwrap().unwrap().amount, 3);
}

// ---------------------------------------------------------------------------
// Guarded writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_concurrent_creates_yield_one_row(pool: PgPool) {
    let store = store_over(pool.clone());
    let guard = guard_over(&store);

    let attempts = (0..8).map(|i| {
        let guard = guard.clone();
        tokio::spawn(async move { guard.atomic_create(&new_item("Race", i)).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(GuardError::AlreadyExists { .. })))
            .count(),
        7
    );

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE name = 'Race'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_create_all_rolls_back_on_unique_violation(pool: PgPool) {
    let store = store_over(pool);
    let guard = guard_over(&store);
    guard.atomic_create(&new_item("taken", 1)).await.unwrap();

    let batch = vec![new_item("a", 1), new_item("b", 2), new_item("taken", 3)];
    assert_matches!(
        guard.atomic_create_all(&batch).await,
        Err(GuardError::AlreadyExists { .. })
    );
    assert_eq!(store.count().await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_save_keeps_own_name_and_bumps_updated_at(pool: PgPool) {
    let store = store_over(pool);
    let guard = guard_over(&store);
    let item = guard.atomic_create(&new_item("self", 1)).await.unwrap();
    guard.atomic_create(&new_item("other", 1)).await.unwrap();

    let saved = guard.atomic_save(item.id, "self", 9).await.unwrap().unwrap();
    assert_eq!(saved.amount, 9);
    assert!(saved.updated_at >= item.updated_at);

    assert_matches!(
        guard.atomic_save(item.id, "other", 9).await,
        Err(GuardError::AlreadyExists { .. })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn test_held_name_lock_times_out(pool: PgPool) {
    let store = PgItemStore::new(pool, Duration::from_millis(200));
    let guard = DuplicateGuard::new(Arc::new(store.clone()), Duration::from_secs(5));

    let mut blocker = store.begin().await.unwrap();
    blocker.lock_name("held").await.unwrap();

    assert_matches!(
        guard.atomic_create(&new_item("held", 1)).await,
        Err(GuardError::Store(StoreError::Timeout))
    );
    blocker.rollback().await.unwrap();
}
