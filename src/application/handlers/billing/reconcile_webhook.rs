//! Webhook reconciliation: maps verified billing events onto durable
//! subscription state and enforces the one-trial-per-card policy.
//!
//! Every write is an idempotent upsert, so redelivered or concurrently
//! delivered events converge on the same final state without locks.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::{
    grants_trial_use, BillingEvent, CheckoutSession, ProviderSubscription, SubscriptionRecord,
    SubscriptionStatus, WebhookError, WebhookVerifier,
};
use crate::domain::foundation::UserId;
use crate::ports::{
    FingerprintLedger, PaymentError, PaymentProvider, SubscriptionStore, UserDirectory,
};

/// How a delivery was resolved. Every variant is acknowledged with HTTP 200;
/// only `Err(WebhookError)` paths are not.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// State was reconciled normally.
    Applied { event_type: String },
    /// Trial abuse was detected; the trial was force-ended and the
    /// post-correction status persisted.
    BlockedTrial {
        event_type: String,
        status: SubscriptionStatus,
    },
    /// The event could not be mapped to a known user. Acknowledged with a
    /// warning and zero writes.
    Unmapped {
        event_type: String,
        warning: String,
    },
    /// An event type this service does not reconcile.
    Ignored { event_type: String },
}

/// Result of the one-trial-per-card check.
struct AbuseCheck {
    reused: bool,
    fingerprint: Option<String>,
}

impl AbuseCheck {
    fn not_reused(fingerprint: Option<String>) -> Self {
        Self {
            reused: false,
            fingerprint,
        }
    }
}

/// Orchestrates verification, classification, and reconciliation of one
/// webhook delivery.
pub struct ReconcileWebhookHandler {
    verifier: WebhookVerifier,
    provider: Arc<dyn PaymentProvider>,
    subscriptions: Arc<dyn SubscriptionStore>,
    fingerprints: Arc<dyn FingerprintLedger>,
    users: Arc<dyn UserDirectory>,
}

impl ReconcileWebhookHandler {
    pub fn new(
        verifier: WebhookVerifier,
        provider: Arc<dyn PaymentProvider>,
        subscriptions: Arc<dyn SubscriptionStore>,
        fingerprints: Arc<dyn FingerprintLedger>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            verifier,
            provider,
            subscriptions,
            fingerprints,
            users,
        }
    }

    /// Verifies the raw delivery and reconciles it. Verification happens
    /// before any side effect.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let event = self.verifier.verify_and_parse(payload, signature_header)?;
        let billing = BillingEvent::classify(&event)?;

        info!(event_id = %event.id, event_type = %event.event_type, "processing webhook event");

        match billing {
            BillingEvent::CheckoutCompleted {
                event_type,
                session,
            } => self.handle_checkout_completed(event_type, session).await,
            BillingEvent::SubscriptionUpserted {
                event_type,
                subscription,
            } => {
                self.handle_subscription_upserted(event_type, subscription)
                    .await
            }
            BillingEvent::SubscriptionDeleted {
                event_type,
                subscription,
            } => {
                self.handle_subscription_deleted(event_type, subscription)
                    .await
            }
            BillingEvent::Other { event_type } => {
                info!(%event_type, "event type not reconciled; acknowledging");
                Ok(ReconcileOutcome::Ignored { event_type })
            }
        }
    }

    async fn handle_checkout_completed(
        &self,
        event_type: String,
        session: CheckoutSession,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let user_id = match self.resolve_checkout_user(&session).await? {
            Some(id) => id,
            None => {
                warn!(session_id = %session.id, "checkout session has no resolvable user");
                return Ok(ReconcileOutcome::Unmapped {
                    event_type,
                    warning: "no user id on checkout session".to_string(),
                });
            }
        };

        self.users.ensure(user_id).await?;

        if let Some(customer_id) = session.customer_id() {
            self.subscriptions
                .upsert_customer_mapping(user_id, customer_id)
                .await?;
        }

        let subscription_id = match session.subscription_id() {
            Some(id) => id.to_string(),
            // One-time payments carry no subscription; the user row is all
            // there is to reconcile.
            None => return Ok(ReconcileOutcome::Applied { event_type }),
        };

        // The session payload is a snapshot from checkout time; fetch the
        // provider's live view before persisting anything.
        let subscription = self
            .provider
            .get_subscription(&subscription_id)
            .await
            .map_err(provider_read_error)?
            .into_provider();

        // The check runs for every checkout, trial or paid: a paid signup
        // seeds the ledger so the same card cannot obtain a trial later on
        // another account.
        let customer_id = session
            .customer_id()
            .map(str::to_string)
            .or_else(|| subscription.customer_id.clone());
        let check = self
            .check_and_record(&subscription, customer_id.as_deref(), user_id)
            .await;
        if check.reused {
            warn!(
                user_id = %user_id,
                fingerprint = check.fingerprint.as_deref().unwrap_or("?"),
                "trial reuse detected on checkout; force-ending trial"
            );
            return self
                .force_end_trial(user_id, &subscription_id, event_type)
                .await;
        }

        self.persist_subscription(user_id, &subscription).await?;
        Ok(ReconcileOutcome::Applied { event_type })
    }

    async fn handle_subscription_upserted(
        &self,
        event_type: String,
        subscription: ProviderSubscription,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let user_id = match self.resolve_subscription_user(&subscription).await? {
            Some(id) => id,
            None => {
                warn!(subscription_id = %subscription.id, "subscription event has no resolvable user");
                return Ok(ReconcileOutcome::Unmapped {
                    event_type,
                    warning: "no user mapped to subscription".to_string(),
                });
            }
        };

        self.users.ensure(user_id).await?;

        if subscription.status == SubscriptionStatus::Trialing {
            let check = self
                .check_and_record(&subscription, subscription.customer_id.as_deref(), user_id)
                .await;
            if check.reused {
                warn!(
                    user_id = %user_id,
                    fingerprint = check.fingerprint.as_deref().unwrap_or("?"),
                    "trial reuse detected on subscription event; force-ending trial"
                );
                return self
                    .force_end_trial(user_id, &subscription.id, event_type)
                    .await;
            }
        }

        self.persist_subscription(user_id, &subscription).await?;
        Ok(ReconcileOutcome::Applied { event_type })
    }

    async fn handle_subscription_deleted(
        &self,
        event_type: String,
        subscription: ProviderSubscription,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let user_id = match self.resolve_subscription_user(&subscription).await? {
            Some(id) => id,
            None => {
                warn!(subscription_id = %subscription.id, "deleted subscription has no resolvable user");
                return Ok(ReconcileOutcome::Unmapped {
                    event_type,
                    warning: "no user mapped to subscription".to_string(),
                });
            }
        };

        self.users.ensure(user_id).await?;
        self.subscriptions
            .upsert(&SubscriptionRecord::canceled_from_provider(
                user_id,
                &subscription,
            ))
            .await?;
        Ok(ReconcileOutcome::Applied { event_type })
    }

    /// Mirrors the provider's current view into the store and marks the
    /// trial consumed when the status warrants it. The flag write happens
    /// first so a partial failure never leaves a live subscription recorded
    /// with an unconsumed trial.
    async fn persist_subscription(
        &self,
        user_id: UserId,
        subscription: &ProviderSubscription,
    ) -> Result<(), WebhookError> {
        if grants_trial_use(&subscription.status) {
            self.users.mark_trial_used(user_id).await?;
        }
        self.subscriptions
            .upsert(&SubscriptionRecord::from_provider(user_id, subscription))
            .await?;
        Ok(())
    }

    /// User resolution for checkout sessions: client reference id or
    /// metadata first, then the store's subscription-id index.
    async fn resolve_checkout_user(
        &self,
        session: &CheckoutSession,
    ) -> Result<Option<UserId>, WebhookError> {
        if let Some(user_id) = session.user_id() {
            return Ok(Some(user_id));
        }
        if let Some(subscription_id) = session.subscription_id() {
            return Ok(self
                .subscriptions
                .find_user_by_subscription_id(subscription_id)
                .await?);
        }
        Ok(None)
    }

    /// User resolution for subscription events: metadata first, then the
    /// subscription-id index, then the customer mapping. Subscription events
    /// routinely arrive before checkout metadata propagates.
    async fn resolve_subscription_user(
        &self,
        subscription: &ProviderSubscription,
    ) -> Result<Option<UserId>, WebhookError> {
        if let Some(user_id) = subscription.metadata_user_id {
            return Ok(Some(user_id));
        }
        if let Some(user_id) = self
            .subscriptions
            .find_user_by_subscription_id(&subscription.id)
            .await?
        {
            return Ok(Some(user_id));
        }
        if let Some(customer_id) = subscription.customer_id.as_deref() {
            return Ok(self
                .subscriptions
                .find_user_by_customer_id(customer_id)
                .await?);
        }
        Ok(None)
    }

    /// One-trial-per-card check. Every failure path fails open: a ledger or
    /// provider hiccup must not block a legitimate checkout.
    async fn check_and_record(
        &self,
        subscription: &ProviderSubscription,
        customer_id: Option<&str>,
        user_id: UserId,
    ) -> AbuseCheck {
        let fingerprint = match self.resolve_fingerprint(subscription, customer_id).await {
            Ok(fp) => fp,
            Err(err) => {
                warn!(error = %err, "fingerprint resolution failed; failing open");
                return AbuseCheck::not_reused(None);
            }
        };

        let Some(fingerprint) = fingerprint else {
            return AbuseCheck::not_reused(None);
        };

        match self.fingerprints.find(&fingerprint).await {
            Ok(Some(entry)) => {
                // Same user replaying their own first trial is not reuse.
                let reused = entry.first_user_id != user_id;
                AbuseCheck {
                    reused,
                    fingerprint: Some(fingerprint),
                }
            }
            Ok(None) => {
                if let Err(err) = self
                    .fingerprints
                    .record_first_use(&fingerprint, user_id, customer_id.unwrap_or(""))
                    .await
                {
                    // Lost a race with a concurrent first use; the window is
                    // accepted rather than blocking the user.
                    warn!(error = %err, %fingerprint, "fingerprint record failed; proceeding");
                }
                AbuseCheck::not_reused(Some(fingerprint))
            }
            Err(err) => {
                warn!(error = %err, %fingerprint, "fingerprint lookup failed; failing open");
                AbuseCheck::not_reused(Some(fingerprint))
            }
        }
    }

    /// Fingerprint resolution chain: the subscription's default payment
    /// method, the customer's invoice default, then the first card on file.
    async fn resolve_fingerprint(
        &self,
        subscription: &ProviderSubscription,
        customer_id: Option<&str>,
    ) -> Result<Option<String>, PaymentError> {
        if let Some(payment_method_id) = subscription.default_payment_method.as_deref() {
            if let Some(fp) = self.provider.card_fingerprint(payment_method_id).await? {
                return Ok(Some(fp));
            }
        }

        let Some(customer_id) = customer_id else {
            return Ok(None);
        };

        if let Some(payment_method_id) = self
            .provider
            .customer_default_payment_method(customer_id)
            .await?
        {
            if let Some(fp) = self.provider.card_fingerprint(&payment_method_id).await? {
                return Ok(Some(fp));
            }
        }

        if let Some(card) = self.provider.first_card_payment_method(customer_id).await? {
            return Ok(card.fingerprint().map(str::to_string));
        }

        Ok(None)
    }

    /// Ends an abusive trial at the provider, then persists the corrected
    /// state. Unlike the fail-open checks, a failure here must surface so the
    /// provider redelivers and the correction is retried.
    async fn force_end_trial(
        &self,
        user_id: UserId,
        subscription_id: &str,
        event_type: String,
    ) -> Result<ReconcileOutcome, WebhookError> {
        self.provider
            .end_trial_now(subscription_id)
            .await
            .map_err(|e| WebhookError::CorrectiveAction(e.to_string()))?;

        let corrected = self
            .provider
            .get_subscription(subscription_id)
            .await
            .map_err(|e| WebhookError::CorrectiveAction(e.to_string()))?
            .into_provider();

        self.users.mark_trial_used(user_id).await?;
        self.subscriptions
            .upsert(&SubscriptionRecord::from_provider(user_id, &corrected))
            .await?;

        info!(%user_id, %subscription_id, status = corrected.status.as_str(), "trial force-ended");
        Ok(ReconcileOutcome::BlockedTrial {
            event_type,
            status: corrected.status,
        })
    }
}

fn provider_read_error(err: PaymentError) -> WebhookError {
    WebhookError::Provider(err.to_string())
}
