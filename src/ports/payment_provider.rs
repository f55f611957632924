//! Outbound port for the payment provider's REST API.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::billing::SubscriptionObject;

/// Errors from provider API calls.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider request failed: {0}")]
    Request(String),

    #[error("payment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected payment provider response: {0}")]
    InvalidResponse(String),
}

/// A card payment method as returned by the provider, carrying the network
/// fingerprint that identifies the physical card across customers.
#[derive(Debug, Clone, Deserialize)]
pub struct CardPaymentMethod {
    pub id: String,
    #[serde(default)]
    pub card: Option<CardDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl CardPaymentMethod {
    pub fn fingerprint(&self) -> Option<&str> {
        self.card.as_ref().and_then(|c| c.fingerprint.as_deref())
    }
}

/// Payment provider operations the reconciler depends on.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetches the live subscription by id.
    async fn get_subscription(&self, subscription_id: &str)
        -> Result<SubscriptionObject, PaymentError>;

    /// The customer's invoice default payment method id, if one is set.
    async fn customer_default_payment_method(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, PaymentError>;

    /// The customer's first attached card payment method, if any.
    async fn first_card_payment_method(
        &self,
        customer_id: &str,
    ) -> Result<Option<CardPaymentMethod>, PaymentError>;

    /// Retrieves a payment method and returns its card fingerprint, if the
    /// method is a card.
    async fn card_fingerprint(
        &self,
        payment_method_id: &str,
    ) -> Result<Option<String>, PaymentError>;

    /// Ends the subscription's trial immediately and clears any scheduled
    /// cancel-at-period-end, moving the subscription straight to paid.
    async fn end_trial_now(&self, subscription_id: &str) -> Result<(), PaymentError>;
}
