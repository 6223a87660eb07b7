//! Storage error type and the mapping from raw driver errors.

use thiserror::Error;

/// PostgreSQL SQLSTATE codes the storage layer distinguishes.
pub const PG_UNIQUE_VIOLATION: &str = "23505";
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
pub const PG_CHECK_VIOLATION: &str = "23514";
pub const PG_LOCK_NOT_AVAILABLE: &str = "55P03";
pub const PG_QUERY_CANCELED: &str = "57014";

/// Name of the partial unique index over live item names.
pub const ITEM_NAME_CONSTRAINT: &str = "uq_items_name_live";

/// Storage-specific errors.
///
/// Constraint violations are kept distinguishable so callers can map them
/// to domain outcomes instead of inspecting driver error codes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    /// A lock wait, statement or transaction exceeded its deadline.
    #[error("storage operation timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code().map(|c| c.into_owned());
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match code.as_deref() {
                Some(PG_UNIQUE_VIOLATION) => return StoreError::UniqueViolation { constraint },
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    return StoreError::ForeignKeyViolation { constraint }
                }
                Some(PG_CHECK_VIOLATION) => return StoreError::CheckViolation { constraint },
                Some(PG_LOCK_NOT_AVAILABLE) | Some(PG_QUERY_CANCELED) => {
                    return StoreError::Timeout
                }
                _ => {}
            }
        }

        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            other => StoreError::Database(other),
        }
    }
}
