//! Classification of raw provider events into typed billing events.
//!
//! The reconciler never matches on event-type strings; the raw envelope is
//! classified exactly once into a `BillingEvent` and dispatched from there.

use std::collections::HashMap;

use serde::Deserialize;

use super::errors::WebhookError;
use super::stripe_event::StripeEvent;
use super::subscription::{ProviderSubscription, SubscriptionStatus};
use crate::domain::foundation::{Timestamp, UserId};

/// Metadata key under which checkout-session creation plants the user id.
pub const USER_ID_METADATA_KEY: &str = "user_id";

/// A reference field that Stripe renders either as a bare id string or as an
/// expanded object carrying an `id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

/// Checkout-session payload, as carried on `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub customer: Option<Expandable>,
    #[serde(default)]
    pub subscription: Option<Expandable>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Resolves the user id for this session: explicit client reference id
    /// first, then the metadata field set by checkout-session creation.
    ///
    /// Values that are not valid UUIDs are treated as absent; the caller
    /// falls through to its unmappable-event path.
    pub fn user_id(&self) -> Option<UserId> {
        self.client_reference_id
            .as_deref()
            .or_else(|| self.metadata.get(USER_ID_METADATA_KEY).map(String::as_str))
            .and_then(|s| s.parse().ok())
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(Expandable::id)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(Expandable::id)
    }
}

/// Subscription payload, as carried on `customer.subscription.*` events and
/// returned by the provider's subscription endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Expandable>,
    pub status: String,
    #[serde(default)]
    pub items: SubscriptionItems,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub default_payment_method: Option<Expandable>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

impl SubscriptionObject {
    /// Converts the wire shape into the domain's provider view.
    pub fn into_provider(self) -> ProviderSubscription {
        let metadata_user_id = self
            .metadata
            .get(USER_ID_METADATA_KEY)
            .and_then(|s| s.parse().ok());

        ProviderSubscription {
            customer_id: self.customer.as_ref().map(|c| c.id().to_string()),
            status: SubscriptionStatus::parse(&self.status),
            price_id: self
                .items
                .data
                .first()
                .and_then(|item| item.price.as_ref())
                .map(|price| price.id.clone()),
            current_period_end: self.current_period_end.and_then(Timestamp::from_unix),
            trial_end: self.trial_end.and_then(Timestamp::from_unix),
            cancel_at_period_end: self.cancel_at_period_end,
            default_payment_method: self
                .default_payment_method
                .as_ref()
                .map(|pm| pm.id().to_string()),
            metadata_user_id,
            id: self.id,
        }
    }
}

/// A verified provider event, classified by the transition it requests.
#[derive(Debug, Clone)]
pub enum BillingEvent {
    /// `checkout.session.completed`
    CheckoutCompleted {
        event_type: String,
        session: CheckoutSession,
    },
    /// `customer.subscription.created` or `customer.subscription.updated`;
    /// both are full-state mirrors of the provider's view.
    SubscriptionUpserted {
        event_type: String,
        subscription: ProviderSubscription,
    },
    /// `customer.subscription.deleted`
    SubscriptionDeleted {
        event_type: String,
        subscription: ProviderSubscription,
    },
    /// Any event type this service does not reconcile; acknowledged without
    /// mutation.
    Other { event_type: String },
}

impl BillingEvent {
    /// Classifies a verified raw event.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Parse` when a recognized event type carries a
    /// payload that does not match its documented shape.
    pub fn classify(event: &StripeEvent) -> Result<Self, WebhookError> {
        let event_type = event.event_type.clone();
        match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSession = event.deserialize_object().map_err(|e| {
                    WebhookError::Parse(format!("invalid checkout session payload: {e}"))
                })?;
                Ok(BillingEvent::CheckoutCompleted {
                    event_type,
                    session,
                })
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                let object: SubscriptionObject = event.deserialize_object().map_err(|e| {
                    WebhookError::Parse(format!("invalid subscription payload: {e}"))
                })?;
                Ok(BillingEvent::SubscriptionUpserted {
                    event_type,
                    subscription: object.into_provider(),
                })
            }
            "customer.subscription.deleted" => {
                let object: SubscriptionObject = event.deserialize_object().map_err(|e| {
                    WebhookError::Parse(format!("invalid subscription payload: {e}"))
                })?;
                Ok(BillingEvent::SubscriptionDeleted {
                    event_type,
                    subscription: object.into_provider(),
                })
            }
            _ => Ok(BillingEvent::Other { event_type }),
        }
    }

    /// The provider's event type string, echoed back in acknowledgments.
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::CheckoutCompleted { event_type, .. }
            | BillingEvent::SubscriptionUpserted { event_type, .. }
            | BillingEvent::SubscriptionDeleted { event_type, .. }
            | BillingEvent::Other { event_type } => event_type,
        }
    }
}
