//! Domain rules for the item service.
//!
//! This crate has no internal dependencies so the same rules can be applied
//! by the storage layer, the HTTP layer and tests.

pub mod error;
pub mod item;
pub mod pagination;
pub mod types;
