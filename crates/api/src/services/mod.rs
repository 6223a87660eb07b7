//! Business rule layer: validation, pagination and write orchestration.
//!
//! Handlers call into services; services call the storage layer through
//! [`itemkit_db::store::ItemStore`] and [`itemkit_db::guard::DuplicateGuard`].

pub mod item_service;

pub use item_service::{ItemError, ItemService};
