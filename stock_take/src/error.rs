//! Error types for stock_take
//!
//! Two layers: [`StoreError`] is what the SQLite item store reports,
//! [`StockError`] is what the scan/update engine hands back to callers.

use thiserror::Error;

/// Errors raised by the item store (database layer)
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write was rejected by a UNIQUE or CHECK constraint
    #[error("{0}")]
    ConstraintViolation(String),
    /// No item row with this id
    #[error("Item {0} not found")]
    NotFound(i64),
    /// No item row with this barcode
    #[error("No item with barcode {0}")]
    UnknownBarcode(String),
    /// Any other SQLite failure
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    /// Constraint failures are split out so callers can turn them into conflicts.
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                StoreError::ConstraintViolation(err.to_string())
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

/// Result type for item store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors returned by the scan/update engine
#[derive(Debug, Error)]
pub enum StockError {
    /// Scan request without a usable barcode
    #[error("Missing barcode")]
    MissingBarcode,
    /// New item is missing a field the creation policy requires
    #[error("Missing required field for new item: {0}")]
    MissingRequiredField(&'static str),
    /// Unknown item id
    #[error("Item {0} not found")]
    NotFound(i64),
    /// Update payload contains a field that cannot be edited
    #[error("Invalid field: {0}")]
    InvalidField(String),
    /// qty is not a non-negative integer
    #[error("Invalid qty: {0} (must be a whole number >= 0)")]
    InvalidQty(String),
    /// Update payload contains no editable field
    #[error("No valid fields to update")]
    NoFieldsToUpdate,
    /// Uniqueness conflict (duplicate part number); safe to retry after fixing input
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Malformed request or rejected write
    #[error("{0}")]
    BadRequest(String),
    /// Server-side failure unrelated to the request (poisoned lock, export failure)
    #[error("Internal error: {0}")]
    Internal(String),
    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, StockError>;
