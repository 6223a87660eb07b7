//! Item entity model and DTOs.

use itemkit_core::item::normalize_name;
use itemkit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `items` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Item {
    pub id: DbId,
    pub name: String,
    pub amount: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Item {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// DTO for creating a new item.
///
/// The name is stored as given; use [`NewItem::normalized`] to trim
/// user input before validation. Missing fields decode to empty values so
/// that a missing name is reported by validation, not by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: u32,
}

impl NewItem {
    /// Build a candidate with its name trimmed.
    pub fn normalized(name: &str, amount: u32) -> Self {
        Self {
            name: normalize_name(name),
            amount,
        }
    }
}

/// Request body for bulk creation: `{"items": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateItems {
    pub items: Vec<NewItem>,
}

/// DTO for a partial item update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub amount: Option<u32>,
}

impl UpdateItem {
    pub fn has_updates(&self) -> bool {
        self.name.is_some() || self.amount.is_some()
    }
}
