//! Repository layer.
//!
//! PostgreSQL implementations of the storage traits in [`crate::store`].

pub mod item_repo;

pub use item_repo::{PgItemStore, PgItemTx};
