//! PostgreSQL adapter for the fingerprint ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::foundation::{StorageError, Timestamp, UserId};
use crate::ports::{FingerprintEntry, FingerprintLedger};

pub struct PostgresFingerprintLedger {
    pool: PgPool,
}

impl PostgresFingerprintLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FingerprintLedger for PostgresFingerprintLedger {
    async fn find(&self, fingerprint: &str) -> Result<Option<FingerprintEntry>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT fingerprint, first_user_id, stripe_customer_id, created_at
            FROM trial_payment_fingerprints
            WHERE fingerprint = $1
            "#,
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        row.map(|r| {
            let first_user_id: Uuid = r
                .try_get("first_user_id")
                .map_err(|e| StorageError::InvalidRow(e.to_string()))?;
            let created_at: DateTime<Utc> = r
                .try_get("created_at")
                .map_err(|e| StorageError::InvalidRow(e.to_string()))?;
            Ok(FingerprintEntry {
                fingerprint: r
                    .try_get("fingerprint")
                    .map_err(|e| StorageError::InvalidRow(e.to_string()))?,
                first_user_id: UserId::from_uuid(first_user_id),
                stripe_customer_id: r
                    .try_get("stripe_customer_id")
                    .map_err(|e| StorageError::InvalidRow(e.to_string()))?,
                created_at: Timestamp::from_datetime(created_at),
            })
        })
        .transpose()
    }

    async fn record_first_use(
        &self,
        fingerprint: &str,
        first_user_id: UserId,
        stripe_customer_id: &str,
    ) -> Result<(), StorageError> {
        // First write wins; a concurrent insert of the same fingerprint is
        // silently absorbed.
        sqlx::query(
            r#"
            INSERT INTO trial_payment_fingerprints
                (fingerprint, first_user_id, stripe_customer_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (fingerprint) DO NOTHING
            "#,
        )
        .bind(fingerprint)
        .bind(first_user_id.as_uuid())
        .bind(stripe_customer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}
