//! Outbound port for the user directory.

use async_trait::async_trait;

use crate::domain::foundation::{StorageError, UserId};

/// Minimal user rows the billing service maintains.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Ensures a user row exists for the id. Idempotent; never overwrites an
    /// existing row.
    async fn ensure(&self, user_id: UserId) -> Result<(), StorageError>;

    /// Sets the user's trial-used flag. Monotonic: the flag is only ever set
    /// true, never cleared by this service.
    async fn mark_trial_used(&self, user_id: UserId) -> Result<(), StorageError>;
}
