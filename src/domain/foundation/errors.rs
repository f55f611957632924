//! Error types shared across storage ports.

use thiserror::Error;

/// Errors surfaced by the durable-store ports.
///
/// Every write in this service is an idempotent upsert, so a storage failure
/// is always safe to surface as a retryable handler failure.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The database rejected or failed the operation.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("invalid row: {0}")]
    InvalidRow(String),
}
