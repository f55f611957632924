//! Outbound port for durable subscription state.

use async_trait::async_trait;

use crate::domain::billing::SubscriptionRecord;
use crate::domain::foundation::{StorageError, UserId};

/// Durable subscription rows, keyed by user id.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Writes the user's subscription row, replacing any existing row for
    /// that user. Idempotent: replaying the same record is a no-op.
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), StorageError>;

    /// Resolves the owning user for a provider subscription id, if a row
    /// references it.
    async fn find_user_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<UserId>, StorageError>;

    /// Records the user-to-provider-customer mapping. Idempotent.
    async fn upsert_customer_mapping(
        &self,
        user_id: UserId,
        customer_id: &str,
    ) -> Result<(), StorageError>;

    /// Resolves the owning user for a provider customer id.
    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, StorageError>;
}
