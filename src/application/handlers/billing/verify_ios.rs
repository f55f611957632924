//! iOS subscription upsert.
//!
//! Mirrors an App Store entitlement claim into the same subscription table
//! the webhook reconciler writes, with `platform = ios`. Receipt
//! cryptography is not performed here; the entitlement list is taken at the
//! caller's word.

use std::sync::Arc;

use tracing::info;

use crate::domain::billing::{
    Platform, SubscriptionRecord, SubscriptionStatus, WebhookError,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{SubscriptionStore, UserDirectory};

#[derive(Debug, Clone)]
pub struct VerifyIosCommand {
    pub user_id: UserId,
    pub product_id: String,
    pub transaction_id: Option<String>,
    /// Product ids the client claims active entitlements for.
    pub active_product_ids: Vec<String>,
}

pub struct VerifyIosHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    users: Arc<dyn UserDirectory>,
}

impl VerifyIosHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            subscriptions,
            users,
        }
    }

    /// Ensures the user row and upserts their iOS subscription row. Returns
    /// the status that was persisted.
    pub async fn handle(
        &self,
        command: VerifyIosCommand,
    ) -> Result<SubscriptionStatus, WebhookError> {
        self.users.ensure(command.user_id).await?;

        let status = if command.active_product_ids.contains(&command.product_id) {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Trialing
        };

        let record = SubscriptionRecord {
            user_id: command.user_id,
            stripe_subscription_id: None,
            status: status.clone(),
            price_id: None,
            current_period_end: None,
            trial_end: None,
            cancel_at_period_end: false,
            platform: Platform::Ios,
            product_id: Some(command.product_id),
            transaction_id: command.transaction_id,
            updated_at: Timestamp::now(),
        };
        self.subscriptions.upsert(&record).await?;

        info!(user_id = %command.user_id, status = status.as_str(), "ios subscription upserted");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::foundation::StorageError;

    #[derive(Default)]
    struct MockStore {
        rows: Mutex<HashMap<UserId, SubscriptionRecord>>,
    }

    #[async_trait]
    impl SubscriptionStore for MockStore {
        async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), StorageError> {
            self.rows
                .lock()
                .unwrap()
                .insert(record.user_id, record.clone());
            Ok(())
        }

        async fn find_user_by_subscription_id(
            &self,
            _subscription_id: &str,
        ) -> Result<Option<UserId>, StorageError> {
            Ok(None)
        }

        async fn upsert_customer_mapping(
            &self,
            _user_id: UserId,
            _customer_id: &str,
        ) -> Result<(), StorageError> {
            Ok(())
        }

        async fn find_user_by_customer_id(
            &self,
            _customer_id: &str,
        ) -> Result<Option<UserId>, StorageError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct MockUsers {
        known: Mutex<HashSet<UserId>>,
    }

    #[async_trait]
    impl UserDirectory for MockUsers {
        async fn ensure(&self, user_id: UserId) -> Result<(), StorageError> {
            self.known.lock().unwrap().insert(user_id);
            Ok(())
        }

        async fn mark_trial_used(&self, _user_id: UserId) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn entitled_product_persists_active_ios_row() {
        let store = Arc::new(MockStore::default());
        let users = Arc::new(MockUsers::default());
        let handler = VerifyIosHandler::new(store.clone(), users.clone());
        let user_id = UserId::new();

        let status = handler
            .handle(VerifyIosCommand {
                user_id,
                product_id: "premium_monthly".to_string(),
                transaction_id: Some("txn_1".to_string()),
                active_product_ids: vec!["premium_monthly".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(status, SubscriptionStatus::Active);
        assert!(users.known.lock().unwrap().contains(&user_id));
        let record = store.rows.lock().unwrap().get(&user_id).cloned().unwrap();
        assert_eq!(record.platform, Platform::Ios);
        assert_eq!(record.product_id.as_deref(), Some("premium_monthly"));
        assert_eq!(record.transaction_id.as_deref(), Some("txn_1"));
        assert!(record.stripe_subscription_id.is_none());
    }

    #[tokio::test]
    async fn unentitled_product_persists_trialing() {
        let store = Arc::new(MockStore::default());
        let users = Arc::new(MockUsers::default());
        let handler = VerifyIosHandler::new(store.clone(), users);
        let user_id = UserId::new();

        let status = handler
            .handle(VerifyIosCommand {
                user_id,
                product_id: "premium_monthly".to_string(),
                transaction_id: None,
                active_product_ids: vec![],
            })
            .await
            .unwrap();

        assert_eq!(status, SubscriptionStatus::Trialing);
        let record = store.rows.lock().unwrap().get(&user_id).cloned().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Trialing);
    }
}
