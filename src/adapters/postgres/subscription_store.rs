//! PostgreSQL adapter for the subscription store.
//!
//! All writes are conflict-target upserts; correctness under concurrent
//! webhook delivery relies on these, not on in-process locking.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::billing::{Platform, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::{StorageError, Timestamp, UserId};
use crate::ports::SubscriptionStore;

pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                user_id, stripe_subscription_id, status, price_id,
                current_period_end, trial_end, cancel_at_period_end,
                platform, product_id, transaction_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                status = EXCLUDED.status,
                price_id = EXCLUDED.price_id,
                current_period_end = EXCLUDED.current_period_end,
                trial_end = EXCLUDED.trial_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                platform = EXCLUDED.platform,
                product_id = EXCLUDED.product_id,
                transaction_id = EXCLUDED.transaction_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.user_id.as_uuid())
        .bind(record.stripe_subscription_id.as_deref())
        .bind(record.status.as_str())
        .bind(record.price_id.as_deref())
        .bind(record.current_period_end.map(|t| *t.as_datetime()))
        .bind(record.trial_end.map(|t| *t.as_datetime()))
        .bind(record.cancel_at_period_end)
        .bind(record.platform.as_str())
        .bind(record.product_id.as_deref())
        .bind(record.transaction_id.as_deref())
        .bind(*record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_user_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<UserId>, StorageError> {
        let row = sqlx::query(
            "SELECT user_id FROM subscriptions WHERE stripe_subscription_id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        row.map(|r| {
            let id: Uuid = r
                .try_get("user_id")
                .map_err(|e| StorageError::InvalidRow(e.to_string()))?;
            Ok(UserId::from_uuid(id))
        })
        .transpose()
    }

    async fn upsert_customer_mapping(
        &self,
        user_id: UserId,
        customer_id: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO stripe_customers (user_id, stripe_customer_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(customer_id)
        .bind(*Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserId>, StorageError> {
        let row = sqlx::query(
            "SELECT user_id FROM stripe_customers WHERE stripe_customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        row.map(|r| {
            let id: Uuid = r
                .try_get("user_id")
                .map_err(|e| StorageError::InvalidRow(e.to_string()))?;
            Ok(UserId::from_uuid(id))
        })
        .transpose()
    }
}
