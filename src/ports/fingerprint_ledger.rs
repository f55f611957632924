//! Outbound port for the one-trial-per-card fingerprint ledger.

use async_trait::async_trait;

use crate::domain::foundation::{StorageError, Timestamp, UserId};

/// A recorded first trial use of a payment card.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintEntry {
    pub fingerprint: String,
    pub first_user_id: UserId,
    pub stripe_customer_id: String,
    pub created_at: Timestamp,
}

/// Append-only ledger of card fingerprints that have consumed a trial.
#[async_trait]
pub trait FingerprintLedger: Send + Sync {
    /// Looks up an existing entry for the fingerprint.
    async fn find(&self, fingerprint: &str) -> Result<Option<FingerprintEntry>, StorageError>;

    /// Records the first trial use of a fingerprint. First write wins: if an
    /// entry already exists the call succeeds without changing it.
    async fn record_first_use(
        &self,
        fingerprint: &str,
        first_user_id: UserId,
        stripe_customer_id: &str,
    ) -> Result<(), StorageError>;
}
