//! Subscription state as mirrored from the payment provider.
//!
//! The provider is the source of truth: every write to the subscription
//! store is a full-state upsert of its current view, never a local delta.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// Subscription status reported by the payment provider.
///
/// Provider-defined values we do not model explicitly are preserved verbatim
/// in `Other` so the stored status always reflects what the provider said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Unpaid,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Paused,
    #[serde(untagged)]
    Other(String),
}

impl SubscriptionStatus {
    /// Parses a provider status string.
    pub fn parse(s: &str) -> Self {
        match s {
            "trialing" => Self::Trialing,
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "unpaid" => Self::Unpaid,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "paused" => Self::Paused,
            other => Self::Other(other.to_string()),
        }
    }

    /// The provider's string form, as stored in the database.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Unpaid => "unpaid",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Paused => "paused",
            Self::Other(s) => s,
        }
    }
}

/// Marks whether a status represents a real subscription start.
///
/// Once a user's subscription reaches `trialing` or `active`, their one-time
/// trial is considered consumed. The flag this feeds is monotonic: it is set
/// true exactly once and never cleared by this service.
pub fn grants_trial_use(status: &SubscriptionStatus) -> bool {
    matches!(
        status,
        SubscriptionStatus::Trialing | SubscriptionStatus::Active
    )
}

/// Billing platform a subscription row originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Stripe,
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Stripe => "stripe",
            Platform::Ios => "ios",
        }
    }
}

/// The provider's current view of a subscription.
///
/// Produced either by parsing a webhook payload or by fetching the live
/// subscription over the provider API; both paths yield the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: Option<String>,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub current_period_end: Option<Timestamp>,
    pub trial_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    /// Payment method id, when the subscription carries one.
    pub default_payment_method: Option<String>,
    /// User id planted in subscription metadata by checkout-session creation.
    pub metadata_user_id: Option<UserId>,
}

/// One durable subscription row, keyed by user id.
///
/// At most one row exists per user; every write is an upsert on that key.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub stripe_subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub price_id: Option<String>,
    pub current_period_end: Option<Timestamp>,
    pub trial_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub platform: Platform,
    pub product_id: Option<String>,
    pub transaction_id: Option<String>,
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// Builds the row for a user from the provider's current subscription
    /// view. Pure; the reconciler calls this for every mirror write.
    pub fn from_provider(user_id: UserId, sub: &ProviderSubscription) -> Self {
        Self {
            user_id,
            stripe_subscription_id: Some(sub.id.clone()),
            status: sub.status.clone(),
            price_id: sub.price_id.clone(),
            current_period_end: sub.current_period_end,
            trial_end: sub.trial_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            platform: Platform::Stripe,
            product_id: None,
            transaction_id: None,
            updated_at: Timestamp::now(),
        }
    }

    /// Builds the terminal row for a deletion event: status forced to
    /// `canceled` and cancel-at-period-end forced true, regardless of what
    /// the payload carried.
    pub fn canceled_from_provider(user_id: UserId, sub: &ProviderSubscription) -> Self {
        let mut record = Self::from_provider(user_id, sub);
        record.status = SubscriptionStatus::Canceled;
        record.cancel_at_period_end = true;
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_sub(status: SubscriptionStatus) -> ProviderSubscription {
        ProviderSubscription {
            id: "sub_123".to_string(),
            customer_id: Some("cus_123".to_string()),
            status,
            price_id: Some("price_monthly".to_string()),
            current_period_end: Timestamp::from_unix(1_735_689_600),
            trial_end: None,
            cancel_at_period_end: false,
            default_payment_method: None,
            metadata_user_id: None,
        }
    }

    #[test]
    fn status_parse_known_values() {
        assert_eq!(
            SubscriptionStatus::parse("trialing"),
            SubscriptionStatus::Trialing
        );
        assert_eq!(
            SubscriptionStatus::parse("past_due"),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::parse("canceled"),
            SubscriptionStatus::Canceled
        );
    }

    #[test]
    fn status_preserves_unknown_values() {
        let status = SubscriptionStatus::parse("some_future_status");
        assert_eq!(
            status,
            SubscriptionStatus::Other("some_future_status".to_string())
        );
        assert_eq!(status.as_str(), "some_future_status");
    }

    #[test]
    fn status_as_str_roundtrip() {
        for s in [
            "trialing",
            "active",
            "past_due",
            "unpaid",
            "canceled",
            "incomplete",
            "incomplete_expired",
            "paused",
        ] {
            assert_eq!(SubscriptionStatus::parse(s).as_str(), s);
        }
    }

    #[test]
    fn trial_use_granted_for_trialing_and_active() {
        assert!(grants_trial_use(&SubscriptionStatus::Trialing));
        assert!(grants_trial_use(&SubscriptionStatus::Active));

        assert!(!grants_trial_use(&SubscriptionStatus::PastDue));
        assert!(!grants_trial_use(&SubscriptionStatus::Canceled));
        assert!(!grants_trial_use(&SubscriptionStatus::Incomplete));
        assert!(!grants_trial_use(&SubscriptionStatus::Other("x".into())));
    }

    #[test]
    fn record_mirrors_provider_state() {
        let user_id = UserId::new();
        let sub = provider_sub(SubscriptionStatus::Trialing);

        let record = SubscriptionRecord::from_provider(user_id, &sub);

        assert_eq!(record.user_id, user_id);
        assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_123"));
        assert_eq!(record.status, SubscriptionStatus::Trialing);
        assert_eq!(record.price_id.as_deref(), Some("price_monthly"));
        assert!(!record.cancel_at_period_end);
        assert_eq!(record.platform, Platform::Stripe);
    }

    #[test]
    fn canceled_record_forces_terminal_fields() {
        let user_id = UserId::new();
        // Deletion payloads can still carry a live-looking status.
        let sub = provider_sub(SubscriptionStatus::Active);

        let record = SubscriptionRecord::canceled_from_provider(user_id, &sub);

        assert_eq!(record.status, SubscriptionStatus::Canceled);
        assert!(record.cancel_at_period_end);
        assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_123"));
    }
}
